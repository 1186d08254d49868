// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-transaction evaluation context
//!
//! The context threads abort state, output data and table resolution
//! through statement execution. Statements signal expected failures by
//! calling [`EvalContext::abort`] and returning; the orchestrator checks
//! the flag after every statement. This keeps the failure path a plain
//! value check on the hot path.
//!
//! Tables are resolved through the context so that commit and rollback
//! operate on exactly the table instances the statements touched, even if
//! the registry changes underneath a long transaction.

use crate::namespace::Namespace;
use crate::table::Table;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Execution context scoped to one transaction evaluation
pub struct EvalContext {
    session_id: String,
    transaction_id: Uuid,
    now_utc: DateTime<Utc>,
    namespace: Arc<Namespace>,
    tables: HashMap<String, Arc<Table>>,
    mutated: Vec<String>,
    aborted: bool,
    failed_statement: Option<String>,
    data: Vec<(String, Value)>,
}

impl EvalContext {
    pub fn new(
        session_id: impl Into<String>,
        transaction_id: Uuid,
        namespace: Arc<Namespace>,
        now_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            transaction_id,
            now_utc,
            namespace,
            tables: HashMap::new(),
            mutated: Vec::new(),
            aborted: false,
            failed_statement: None,
            data: Vec::new(),
        }
    }

    /// Session the transaction runs under
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transaction_id(&self) -> Uuid {
        self.transaction_id
    }

    /// Wall-clock timestamp shared by every statement in the transaction
    pub fn now_utc(&self) -> DateTime<Utc> {
        self.now_utc
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    /// Resolve a table by name, creating it lazily in the namespace and
    /// caching the instance for the rest of the transaction.
    pub fn resolve_table(&mut self, name: &str) -> Arc<Table> {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| self.namespace.get_or_make_table(name))
            .clone()
    }

    /// Record that a table's slots carry tentative changes from this
    /// transaction. Called by the mutating table primitives.
    pub fn record_mutated(&mut self, table_name: &str) {
        if !self.mutated.iter().any(|name| name == table_name) {
            self.mutated.push(table_name.to_string());
        }
    }

    /// The tables mutated so far, in first-mutation order
    pub fn mutated_tables(&self) -> Vec<Arc<Table>> {
        self.mutated
            .iter()
            .filter_map(|name| self.tables.get(name).cloned())
            .collect()
    }

    pub fn has_mutations(&self) -> bool {
        !self.mutated.is_empty()
    }

    /// Signal an expected failure; the first reason wins
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.aborted = true;
        if self.failed_statement.is_none() {
            self.failed_statement = Some(reason.into());
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Description of the first failure, if any
    pub fn failed_statement(&self) -> Option<&str> {
        self.failed_statement.as_deref()
    }

    /// Clear abort state so the context can be reused
    pub fn reset_abort(&mut self) {
        self.aborted = false;
        self.failed_statement = None;
    }

    /// Append a key/value pair to the transaction's output data
    pub fn add_data(&mut self, key: impl Into<String>, value: Value) {
        self.data.push((key.into(), value));
    }

    pub fn take_data(&mut self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.data)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
