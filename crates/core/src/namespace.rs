// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespaces: the unit of transactional serialization
//!
//! A namespace owns a registry of tables and the exclusive lock under
//! which transaction effects are applied. Table lookup and lazy creation
//! are concurrency-safe on their own so statement preparation can resolve
//! tables without holding the transaction lock.

use crate::table::Table;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Named collection of tables; at most one transaction's effects are in
/// flight against a namespace at any instant
#[derive(Debug)]
pub struct Namespace {
    name: String,
    tables: DashMap<String, Arc<Table>>,
    transactions: Mutex<()>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: DashMap::new(),
            transactions: Mutex::new(()),
        }
    }

    /// Namespace name as first registered (lookup is case-insensitive,
    /// display keeps the original casing)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the exclusive transaction lock. Held during statement
    /// execution and commit/rollback, and by the sweep while it operates
    /// on this namespace's tables; never during preparation.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.transactions.lock()
    }

    /// Resolve a table, creating it on first reference. Table names are
    /// caller-supplied identifiers and compare case-sensitively.
    pub fn get_or_make_table(&self, name: &str) -> Arc<Table> {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Table::new(name)))
            .value()
            .clone()
    }

    pub fn get_table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.get(name).map(|entry| entry.value().clone())
    }

    /// Unregister a table that holds no slots; returns whether removal
    /// occurred. Called only by the sweep, under the transaction lock.
    pub fn remove_table_if_empty(&self, table: &Arc<Table>) -> bool {
        self.tables
            .remove_if(table.name(), |_, registered| registered.is_empty())
            .is_some()
    }

    /// Snapshot of the registered tables
    pub fn tables(&self) -> Vec<Arc<Table>> {
        self.tables
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Total committed variables across all tables
    pub fn variable_count(&self) -> i64 {
        self.tables
            .iter()
            .map(|entry| entry.value().committed_variable_count())
            .sum()
    }
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;
