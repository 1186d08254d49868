// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background sweep thread
//!
//! One dedicated thread drives the periodic sweep: trust recomputation,
//! variable expiration, empty-table removal and idle-session eviction all
//! happen here, never on a request path. The thread exits when the server
//! stops or the sweeper is shut down, whichever comes first; shutdown
//! wakes it immediately through a condvar instead of waiting out the
//! interval.

use crate::clock::Clock;
use crate::server::LockServer;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::info;

/// Sweep loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Tick granularity
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Add up to a tenth of the interval of random delay per tick so
    /// restarts do not align their sweeps
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            jitter: default_jitter(),
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

fn default_interval() -> Duration {
    Duration::from_millis(3500)
}

fn default_jitter() -> bool {
    true
}

/// Handle to the background sweep thread
pub struct Sweeper {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<(Mutex<bool>, Condvar)>,
}

impl Sweeper {
    /// Spawn the sweep thread for the given server
    pub fn spawn<C: Clock + 'static>(
        server: Arc<LockServer<C>>,
        config: SweepConfig,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = std::thread::Builder::new()
            .name("varlock-sweep".to_string())
            .spawn(move || run_loop(server, config, thread_shutdown))?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    /// Wake the thread and wait for it to exit
    pub fn stop(mut self) {
        self.signal_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn signal_shutdown(&self) {
        let (lock, condvar) = &*self.shutdown;
        *lock.lock() = true;
        condvar.notify_all();
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

fn run_loop<C: Clock>(
    server: Arc<LockServer<C>>,
    config: SweepConfig,
    shutdown: Arc<(Mutex<bool>, Condvar)>,
) {
    info!(interval = ?config.interval, "sweep thread started");
    loop {
        let wait = if config.jitter {
            config.interval + server.jitter(config.interval / 10)
        } else {
            config.interval
        };

        {
            let (lock, condvar) = &*shutdown;
            let mut stop = lock.lock();
            if !*stop {
                condvar.wait_for(&mut stop, wait);
            }
            if *stop {
                break;
            }
        }
        if !server.is_running() {
            break;
        }

        server.sweep_tick();
    }
    info!("sweep thread stopped");
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
