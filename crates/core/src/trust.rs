// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive trust level derived from call-rate volatility
//!
//! The tracker keeps a norm of recent call volume: it snaps up instantly
//! when a tick exceeds it and decays multiplicatively otherwise, so a
//! gradual quiet-down is not alarming. Trust degrades in proportion to how
//! sharply the call volume has dropped below the norm, a proxy for a
//! network partition or partial failure rather than raw load. A steady
//! quiet server is fully trusted.
//!
//! When trust falls below the entropy threshold, the tick outcome is mixed
//! into the server's random source. The same source supplies sweep jitter.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::time::Duration;

/// Multiplicative norm decay per tick
pub const DEFAULT_DECAY: f64 = 0.83;

/// Below this trust level, tick outcomes feed the random source
const ENTROPY_THRESHOLD: f64 = 0.9;

/// Call-rate statistics and the trust level derived from them
#[derive(Debug)]
pub struct TrustTracker {
    decay: f64,
    calls_norm: f64,
    trust_level: f64,
    rng: StdRng,
}

impl TrustTracker {
    pub fn new(decay: f64) -> Self {
        Self {
            decay,
            calls_norm: 0.0,
            trust_level: 1.0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fold one tick's call count into the norm and recompute trust
    pub fn tick(&mut self, current_calls: u64) -> f64 {
        let calls = current_calls as f64;
        if calls > self.calls_norm {
            self.calls_norm = calls;
        } else {
            self.calls_norm *= self.decay;
        }

        if self.calls_norm > 1.0 {
            self.trust_level =
                (1.0 - (self.calls_norm - calls) / self.calls_norm).min(1.0);
        } else {
            self.trust_level = 1.0;
            self.calls_norm = 0.0;
        }

        if self.trust_level < ENTROPY_THRESHOLD {
            let seed = self.rng.next_u64() ^ self.trust_level.to_bits();
            self.rng = StdRng::seed_from_u64(seed);
        }

        self.trust_level
    }

    /// Current trust level in `0.0..=1.0`
    pub fn trust_level(&self) -> f64 {
        self.trust_level
    }

    /// Current adaptive call-volume ceiling
    pub fn calls_norm(&self) -> f64 {
        self.calls_norm
    }

    /// Random duration up to `max`, from the hardened source
    pub fn jitter(&mut self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.gen_range(0..=max.as_millis() as u64))
    }
}

impl Default for TrustTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY)
    }
}

#[cfg(test)]
#[path = "trust_tests.rs"]
mod tests;
