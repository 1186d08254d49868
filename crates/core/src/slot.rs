// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned variable container with tentative change and commit/rollback
//!
//! A slot holds the list of variables sharing one name within a table. The
//! first `change` inside a transaction snapshots the pre-transaction list;
//! later changes in the same transaction replace the working list without
//! re-snapshotting. Committing discards the snapshot, rolling back restores
//! it. The table only commits or rolls back slots it has recorded as
//! pending, so both operations tolerate being reached through duplicates.

use crate::variable::Variable;
use chrono::{DateTime, Utc};

/// Holder for the variables sharing one name
#[derive(Debug, Clone, Default)]
pub struct Slot {
    working: Vec<Variable>,
    snapshot: Option<Vec<Variable>>,
}

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current working list
    pub fn variables(&self) -> &[Variable] {
        &self.working
    }

    /// Whether a tentative change is in flight
    pub fn is_changing(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    /// Replace the working list, snapshotting the committed state on the
    /// first change of a transaction
    pub fn change(&mut self, new_list: Vec<Variable>) {
        if self.snapshot.is_none() {
            self.snapshot = Some(std::mem::take(&mut self.working));
        }
        self.working = new_list;
    }

    /// Keep the working list, discard the snapshot; returns the net change
    /// in variable count. A commit without a change in flight is a no-op.
    pub fn commit(&mut self) -> i64 {
        match self.snapshot.take() {
            Some(snapshot) => self.working.len() as i64 - snapshot.len() as i64,
            None => 0,
        }
    }

    /// Restore the snapshot, discarding the working list. A rollback
    /// without a change in flight is a no-op.
    pub fn rollback(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.working = snapshot;
        }
    }

    /// Remove expired variables from the working list in place.
    ///
    /// Runs only between transactions on the owning table (the sweep holds
    /// the namespace lock), never while a change is in flight.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.working.len();
        self.working.retain(|v| !v.is_expired(now));
        before - self.working.len()
    }

    /// Remove all variables owned by the given session from the working
    /// list in place; same timing constraints as [`Slot::remove_expired`].
    pub fn purge_session(&mut self, session_id: &str) -> usize {
        let before = self.working.len();
        self.working.retain(|v| !v.is_owned_by(session_id));
        before - self.working.len()
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
