// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server counters for the instrumentation surface
//!
//! Counters are cumulative except `calls_since_tick`, which the sweep
//! drains once per tick to drive the trust tracker. A snapshot is flushed
//! as a tracing event each tick and served to status queries.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::transaction::{ErrorCause, TransactionStatus};

/// Atomic counter block shared across worker threads and the sweep
#[derive(Debug, Default)]
pub struct ServerStats {
    calls_since_tick: AtomicU64,
    transactions_ok: AtomicU64,
    transactions_rejected: AtomicU64,
    transactions_session_expired: AtomicU64,
    transactions_statement_failed: AtomicU64,
    transactions_call_failed: AtomicU64,
    pings: AtomicU64,
    sessions_ended: AtomicU64,
    sessions_expired: AtomicU64,
    variables_expired: AtomicU64,
    tables_removed: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a call toward the current tick's volume
    pub fn record_call(&self) {
        self.calls_since_tick.fetch_add(1, Ordering::Relaxed);
    }

    /// Drain the per-tick call count
    pub fn take_calls(&self) -> u64 {
        self.calls_since_tick.swap(0, Ordering::Relaxed)
    }

    /// Count a transaction outcome by status and cause
    pub fn record_outcome(&self, status: TransactionStatus, cause: ErrorCause) {
        match (status, cause) {
            (TransactionStatus::Ok, _) => &self.transactions_ok,
            (TransactionStatus::Error, ErrorCause::MinimumRequirements) => {
                &self.transactions_rejected
            }
            (TransactionStatus::Error, ErrorCause::SessionExpired) => {
                &self.transactions_session_expired
            }
            (TransactionStatus::Error, ErrorCause::Statement) => {
                &self.transactions_statement_failed
            }
            (TransactionStatus::Error, ErrorCause::Unspecified) => {
                &self.transactions_call_failed
            }
        }
        .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ping(&self) {
        self.pings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_ended(&self) {
        self.sessions_ended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sessions_expired(&self, count: u64) {
        self.sessions_expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_variables_expired(&self, count: u64) {
        self.variables_expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_tables_removed(&self, count: u64) {
        self.tables_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transactions_ok: self.transactions_ok.load(Ordering::Relaxed),
            transactions_rejected: self.transactions_rejected.load(Ordering::Relaxed),
            transactions_session_expired: self
                .transactions_session_expired
                .load(Ordering::Relaxed),
            transactions_statement_failed: self
                .transactions_statement_failed
                .load(Ordering::Relaxed),
            transactions_call_failed: self.transactions_call_failed.load(Ordering::Relaxed),
            pings: self.pings.load(Ordering::Relaxed),
            sessions_ended: self.sessions_ended.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
            variables_expired: self.variables_expired.load(Ordering::Relaxed),
            tables_removed: self.tables_removed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the cumulative counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub transactions_ok: u64,
    pub transactions_rejected: u64,
    pub transactions_session_expired: u64,
    pub transactions_statement_failed: u64,
    pub transactions_call_failed: u64,
    pub pings: u64,
    pub sessions_ended: u64,
    pub sessions_expired: u64,
    pub variables_expired: u64,
    pub tables_removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_calls_drains_the_tick_counter() {
        let stats = ServerStats::new();
        stats.record_call();
        stats.record_call();

        assert_eq!(stats.take_calls(), 2);
        assert_eq!(stats.take_calls(), 0);
    }

    #[test]
    fn outcomes_count_under_their_cause() {
        let stats = ServerStats::new();
        stats.record_outcome(TransactionStatus::Ok, ErrorCause::Unspecified);
        stats.record_outcome(TransactionStatus::Error, ErrorCause::MinimumRequirements);
        stats.record_outcome(TransactionStatus::Error, ErrorCause::SessionExpired);
        stats.record_outcome(TransactionStatus::Error, ErrorCause::Statement);
        stats.record_outcome(TransactionStatus::Error, ErrorCause::Statement);
        stats.record_outcome(TransactionStatus::Error, ErrorCause::Unspecified);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.transactions_ok, 1);
        assert_eq!(snapshot.transactions_rejected, 1);
        assert_eq!(snapshot.transactions_session_expired, 1);
        assert_eq!(snapshot.transactions_statement_failed, 2);
        assert_eq!(snapshot.transactions_call_failed, 1);
    }

    #[test]
    fn sweep_counters_accumulate() {
        let stats = ServerStats::new();
        stats.record_variables_expired(3);
        stats.record_variables_expired(2);
        stats.record_tables_removed(1);
        stats.record_sessions_expired(1);
        stats.record_session_ended();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.variables_expired, 5);
        assert_eq!(snapshot.tables_removed, 1);
        assert_eq!(snapshot.sessions_expired, 1);
        assert_eq!(snapshot.sessions_ended, 1);
    }
}
