// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named slot collection and the primitive operations statements invoke
//!
//! A table belongs to exactly one namespace. All slot mutation happens
//! under the owning namespace's transaction lock; the interior mutex keeps
//! the type `Sync` without depending on that discipline for memory safety.
//!
//! Tentative changes are tracked per transaction in `pending_changes`
//! (slot names, duplicates tolerated) until the server commits or rolls
//! back. Committed contributions are tracked per session so a dying
//! session's variables can be purged.

use crate::context::EvalContext;
use crate::slot::Slot;
use crate::variable::Variable;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Named collection of slots within a namespace
#[derive(Debug)]
pub struct Table {
    name: String,
    state: Mutex<TableState>,
}

#[derive(Debug, Default)]
struct TableState {
    slots: HashMap<String, Slot>,
    /// Slot names with tentative changes in the current transaction
    pending_changes: Vec<String>,
    /// Slot names each session has committed variables into
    session_owned: HashMap<String, HashSet<String>>,
    committed_variables: i64,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(TableState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot_count(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().slots.is_empty()
    }

    /// Net count of committed variables across all slots
    pub fn committed_variable_count(&self) -> i64 {
        self.state.lock().committed_variables
    }

    /// Whether a variable with the given name and value exists
    pub fn exists(
        &self,
        ctx: &EvalContext,
        name: &str,
        value: &Value,
        ignore_this_session: bool,
    ) -> bool {
        let state = self.state.lock();
        let Some(slot) = state.slots.get(name) else {
            return false;
        };
        slot.variables()
            .iter()
            .filter(|v| !(ignore_this_session && v.is_owned_by(ctx.session_id())))
            .any(|v| v.value == *value)
    }

    /// First variable under the given name, in slot insertion order
    pub fn get_variable(
        &self,
        ctx: &EvalContext,
        name: &str,
        ignore_this_session: bool,
    ) -> Option<Variable> {
        let state = self.state.lock();
        let slot = state.slots.get(name)?;
        slot.variables()
            .iter()
            .find(|v| !(ignore_this_session && v.is_owned_by(ctx.session_id())))
            .cloned()
    }

    /// All variables under the given name, in slot insertion order
    pub fn get_variables(
        &self,
        ctx: &EvalContext,
        name: &str,
        ignore_this_session: bool,
    ) -> Vec<Variable> {
        let state = self.state.lock();
        let Some(slot) = state.slots.get(name) else {
            return Vec::new();
        };
        slot.variables()
            .iter()
            .filter(|v| !(ignore_this_session && v.is_owned_by(ctx.session_id())))
            .cloned()
            .collect()
    }

    /// Tentatively append a variable under the given name.
    ///
    /// Returns false without touching the slot when a variable already
    /// exists under the name and duplicates are not allowed.
    pub fn set_variable(
        &self,
        ctx: &mut EvalContext,
        name: &str,
        value: Value,
        description: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        allow_duplicates: bool,
    ) -> bool {
        {
            let mut state = self.state.lock();
            let slot = state.slots.entry(name.to_string()).or_default();
            if !allow_duplicates && !slot.is_empty() {
                return false;
            }

            let mut variable = Variable::new(
                ctx.session_id(),
                ctx.transaction_id(),
                value,
                ctx.now_utc(),
            )
            .with_expires_at(expires_at);
            if let Some(description) = description {
                variable = variable.with_description(description);
            }

            let mut list = slot.variables().to_vec();
            list.push(variable);
            slot.change(list);
            state.pending_changes.push(name.to_string());
        }
        ctx.record_mutated(&self.name);
        true
    }

    /// Tentatively remove the calling session's variables under the given
    /// name, all of them or only those matching `value`.
    ///
    /// Returns false when nothing matched.
    pub fn delete_variable(&self, ctx: &mut EvalContext, name: &str, value: Option<&Value>) -> bool {
        {
            let mut state = self.state.lock();
            let Some(slot) = state.slots.get_mut(name) else {
                return false;
            };
            let keep: Vec<Variable> = slot
                .variables()
                .iter()
                .filter(|v| {
                    !(v.is_owned_by(ctx.session_id())
                        && value.is_none_or(|value| v.value == *value))
                })
                .cloned()
                .collect();
            if keep.len() == slot.len() {
                return false;
            }
            slot.change(keep);
            state.pending_changes.push(name.to_string());
        }
        ctx.record_mutated(&self.name);
        true
    }

    /// Remove expired variables from every slot in place; drops slots that
    /// become empty. Called only by the sweep, between transactions.
    pub fn remove_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.lock();
        let mut removed = 0;
        for slot in state.slots.values_mut() {
            removed += slot.remove_expired(now);
        }
        state
            .slots
            .retain(|_, slot| !slot.is_empty() || slot.is_changing());
        state.committed_variables -= removed as i64;
        removed
    }

    /// Commit every pending slot change on behalf of the given session
    pub fn commit(&self, session_id: &str) {
        let mut state = self.state.lock();
        let TableState {
            slots,
            pending_changes,
            session_owned,
            committed_variables,
        } = &mut *state;

        for name in pending_changes.drain(..) {
            let Some(slot) = slots.get_mut(&name) else {
                continue;
            };
            if !slot.is_changing() {
                continue; // duplicate pending entry, already handled
            }
            *committed_variables += slot.commit();
            if slot.is_empty() {
                slots.remove(&name);
            } else {
                session_owned
                    .entry(session_id.to_string())
                    .or_default()
                    .insert(name);
            }
        }
    }

    /// Roll back every pending slot change
    pub fn rollback(&self) {
        let mut state = self.state.lock();
        let TableState {
            slots,
            pending_changes,
            ..
        } = &mut *state;

        for name in pending_changes.drain(..) {
            if let Some(slot) = slots.get_mut(&name) {
                slot.rollback();
            }
        }
        state
            .slots
            .retain(|_, slot| !slot.is_empty() || slot.is_changing());
    }

    /// Purge a dying session's variables from every slot it contributed
    /// to; returns the number of variables removed.
    pub fn end_session(&self, session_id: &str) -> usize {
        let mut state = self.state.lock();
        let TableState {
            slots,
            session_owned,
            committed_variables,
            ..
        } = &mut *state;

        let Some(names) = session_owned.remove(session_id) else {
            return 0;
        };
        let mut removed = 0;
        for name in names {
            let Some(slot) = slots.get_mut(&name) else {
                continue;
            };
            removed += slot.purge_session(session_id);
            if slot.is_empty() && !slot.is_changing() {
                slots.remove(&name);
            }
        }
        *committed_variables -= removed as i64;
        removed
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
