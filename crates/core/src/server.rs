// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lock server orchestrator
//!
//! Owns the session and namespace registries and the two public
//! operations, `execute_lock_transaction` and `end_lock_session`. The
//! registries are sharded concurrent maps so lookup and lazy creation
//! never take a global lock; serialization happens at the entities
//! themselves (session lock for the whole call, namespace lock for the
//! execute-and-commit phase only).

use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::context::EvalContext;
use crate::error::ContractError;
use crate::namespace::Namespace;
use crate::session::{Session, SessionData};
use crate::statement::Statement;
use crate::stats::ServerStats;
use crate::transaction::{
    ErrorCause, LockTransaction, LockTransactionResult, TransactionStatus,
};
use crate::trust::TrustTracker;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Single-node, in-memory lock transaction server
pub struct LockServer<C: Clock = SystemClock> {
    config: ServerConfig,
    clock: C,
    started_at: Instant,
    running: AtomicBool,
    sessions: DashMap<String, Arc<Session>>,
    /// Keyed by lowercased name; the namespace keeps its original casing
    namespaces: DashMap<String, Arc<Namespace>>,
    stats: ServerStats,
    trust: Mutex<TrustTracker>,
}

impl LockServer<SystemClock> {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> LockServer<C> {
    pub fn with_clock(config: ServerConfig, clock: C) -> Self {
        let trust = TrustTracker::new(config.trust_decay);
        Self {
            config,
            started_at: clock.now(),
            clock,
            running: AtomicBool::new(true),
            sessions: DashMap::new(),
            namespaces: DashMap::new(),
            stats: ServerStats::new(),
            trust: Mutex::new(trust),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop accepting work; in-flight calls return a failed result
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn uptime(&self) -> Duration {
        self.clock.now().duration_since(self.started_at)
    }

    pub fn trust_level(&self) -> f64 {
        self.trust.lock().trust_level()
    }

    pub fn calls_norm(&self) -> f64 {
        self.trust.lock().calls_norm()
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Random duration up to `max` from the trust-hardened source
    pub fn jitter(&self, max: Duration) -> Duration {
        self.trust.lock().jitter(max)
    }

    /// Execute a lock transaction for the given session.
    ///
    /// Returns `Err` only for caller contract violations; every runtime
    /// outcome, including rejection and statement failure, is a result.
    pub fn execute_lock_transaction<S: Statement>(
        &self,
        session_data: &SessionData,
        transaction: LockTransaction<S>,
    ) -> Result<LockTransactionResult, ContractError> {
        if session_data.id.trim().is_empty() {
            return Err(ContractError::BlankSessionId);
        }
        if !transaction.is_ping() && transaction.namespace.trim().is_empty() {
            return Err(ContractError::BlankNamespace(transaction.id));
        }

        if !self.is_running() {
            let result = self.result(transaction.id, TransactionStatus::Error, None, Vec::new());
            self.stats.record_outcome(result.status, result.error_cause);
            return Ok(result);
        }
        self.stats.record_call();

        // Admission happens before any session or namespace is touched,
        // shielding a cold or distrusted server from load.
        if transaction.minimum_required_runtime_secs > self.uptime().as_secs()
            || transaction.minimum_required_trust_level > self.trust_level()
        {
            let result = self.error(transaction.id, ErrorCause::MinimumRequirements);
            self.stats.record_outcome(result.status, result.error_cause);
            return Ok(result);
        }

        let session = self
            .sessions
            .entry(session_data.id.clone())
            .or_insert_with(|| Arc::new(Session::new(session_data, self.clock.now())))
            .value()
            .clone();

        // Serializes every operation for this session id, pings included.
        let mut state = session.lock();
        if state.is_disposed() {
            let result = self.error(transaction.id, ErrorCause::SessionExpired);
            self.stats.record_outcome(result.status, result.error_cause);
            return Ok(result);
        }
        state.touch(self.clock.now());
        if let Some(max_age) = session_data.max_age {
            state.set_max_age(max_age);
        }

        if transaction.is_ping() {
            self.stats.record_ping();
            let result = self.result(transaction.id, TransactionStatus::Ok, None, Vec::new());
            self.stats.record_outcome(result.status, result.error_cause);
            return Ok(result);
        }

        let LockTransaction {
            id: transaction_id,
            namespace: namespace_name,
            statements,
            description,
            ..
        } = transaction;
        let mut statements = statements.unwrap_or_default();
        debug!(
            transaction = %transaction_id,
            namespace = %namespace_name,
            statements = statements.len(),
            description = description.as_deref().unwrap_or(""),
            "executing lock transaction"
        );

        let namespace = self.get_or_make_namespace(&namespace_name);
        let mut ctx = EvalContext::new(
            session_data.id.clone(),
            transaction_id,
            namespace.clone(),
            self.clock.now_utc(),
        );

        // Preparation runs unlocked: validation and table resolution only,
        // so it never serializes sessions sharing a namespace.
        for statement in statements.iter_mut() {
            statement.prepare(&mut ctx);
            if ctx.is_aborted() {
                break;
            }
        }

        let mut committed = false;
        if !ctx.is_aborted() {
            let _guard = namespace.lock();
            for statement in statements.iter_mut() {
                statement.execute(&mut ctx);
                if ctx.is_aborted() {
                    break;
                }
            }
            if ctx.is_aborted() {
                for table in ctx.mutated_tables() {
                    table.rollback();
                }
            } else {
                for table in ctx.mutated_tables() {
                    table.commit(session.id());
                }
                committed = true;
            }
        }

        if committed && ctx.has_mutations() {
            state.record_mutated_namespace(namespace);
        }

        let result = if ctx.is_aborted() {
            let failed = ctx.failed_statement().map(str::to_string);
            let mut result = self.error(transaction_id, ErrorCause::Statement);
            result.failed_statement = failed;
            result
        } else {
            self.result(
                transaction_id,
                TransactionStatus::Ok,
                None,
                ctx.take_data(),
            )
        };
        self.stats.record_outcome(result.status, result.error_cause);
        Ok(result)
    }

    /// End a session: dispose it and purge its variables.
    ///
    /// Returns false for unknown or already-ended sessions; double-ending
    /// is a no-op, not an error. The disposed session stays registered
    /// until the next sweep reaps it, so later calls bearing the same id
    /// observe `SessionExpired` instead of silently recreating a session.
    pub fn end_lock_session(&self, session_id: &str) -> bool {
        self.stats.record_call();

        let Some(session) = self
            .sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
        else {
            return false;
        };

        let mut state = session.lock();
        if state.is_disposed() {
            return false;
        }
        let purged = state.dispose(session.id());
        self.stats.record_session_ended();
        debug!(session = session_id, purged, "session ended");
        true
    }

    /// Resolve a namespace, creating it on first reference. Namespace
    /// names compare case-insensitively.
    pub fn get_or_make_namespace(&self, name: &str) -> Arc<Namespace> {
        let key = name.to_lowercase();
        self.namespaces
            .entry(key)
            .or_insert_with(|| Arc::new(Namespace::new(name)))
            .value()
            .clone()
    }

    pub fn get_namespace(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces
            .get(&name.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    /// Snapshot of the registered namespaces
    pub fn namespaces(&self) -> Vec<Arc<Namespace>> {
        self.namespaces
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// One pass of the background sweep: recompute trust, expire
    /// variables, drop empty tables, evict idle sessions, flush stats.
    pub fn sweep_tick(&self) -> SweepReport {
        let now = self.clock.now();
        let now_utc = self.clock.now_utc();

        let current_calls = self.stats.take_calls();
        let (trust_level, calls_norm) = {
            let mut trust = self.trust.lock();
            (trust.tick(current_calls), trust.calls_norm())
        };

        let mut variables_expired = 0;
        let mut tables_removed = 0;
        for namespace in self.namespaces() {
            // Hold the namespace's transaction lock only while operating
            // on its tables.
            let _guard = namespace.lock();
            for table in namespace.tables() {
                variables_expired += table.remove_expired(now_utc);
                if table.is_empty() && namespace.remove_table_if_empty(&table) {
                    tables_removed += 1;
                }
            }
        }

        let mut sessions_expired = 0;
        for (id, session) in self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect::<Vec<_>>()
        {
            // Never block on a busy session; it will be re-checked next tick.
            let Some(mut state) = session.try_lock() else {
                continue;
            };
            if state.is_disposed() {
                self.sessions.remove(&id);
                continue;
            }
            let max_age = state
                .max_age()
                .unwrap_or(self.config.default_session_max_age);
            if state.idle(now) > max_age {
                self.sessions.remove(&id);
                state.dispose(&id);
                sessions_expired += 1;
            }
        }

        self.stats.record_variables_expired(variables_expired as u64);
        self.stats.record_tables_removed(tables_removed as u64);
        self.stats.record_sessions_expired(sessions_expired as u64);

        let report = SweepReport {
            trust_level,
            calls_norm,
            current_calls,
            variables_expired,
            tables_removed,
            sessions_expired,
        };
        debug!(
            trust_level,
            calls_norm,
            current_calls,
            variables_expired,
            tables_removed,
            sessions_expired,
            "sweep tick"
        );
        report
    }

    fn result(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
        failed_statement: Option<String>,
        data: Vec<(String, Value)>,
    ) -> LockTransactionResult {
        LockTransactionResult {
            transaction_id,
            server_host: self.config.host.clone(),
            status,
            error_cause: ErrorCause::Unspecified,
            failed_statement,
            runtime_secs: self.uptime().as_secs(),
            trust_level: self.trust_level(),
            data,
        }
    }

    fn error(&self, transaction_id: Uuid, cause: ErrorCause) -> LockTransactionResult {
        let mut result = self.result(transaction_id, TransactionStatus::Error, None, Vec::new());
        result.error_cause = cause;
        result
    }
}

/// What one sweep tick did
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub trust_level: f64,
    pub calls_norm: f64,
    pub current_calls: u64,
    pub variables_expired: usize,
    pub tables_removed: usize,
    pub sessions_expired: usize,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
