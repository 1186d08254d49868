// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state and lifecycle
//!
//! A session is the server-side binding for one remote client. Its mutex
//! is held for the full duration of a server call, serializing all
//! operations for one session id while leaving other sessions untouched.
//! The sweep only ever try-locks a session so it never stalls foreground
//! traffic.
//!
//! Disposal purges the session's committed variables from every namespace
//! it has mutated, taking each namespace's transaction lock while doing
//! so. Lock order is session before namespace everywhere in the crate.

use crate::namespace::Namespace;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Client-supplied session identity carried on every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Idle timeout; the server default applies when absent
    #[serde(default, with = "humantime_serde::option")]
    pub max_age: Option<Duration>,
}

impl SessionData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            max_age: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// Server-side session state
#[derive(Debug)]
pub struct Session {
    id: String,
    state: Mutex<SessionState>,
}

#[derive(Debug)]
pub struct SessionState {
    description: Option<String>,
    max_age: Option<Duration>,
    last_interaction: Instant,
    mutated_namespaces: HashMap<String, Arc<Namespace>>,
    disposed: bool,
}

impl Session {
    pub fn new(data: &SessionData, now: Instant) -> Self {
        Self {
            id: data.id.clone(),
            state: Mutex::new(SessionState {
                description: data.description.clone(),
                max_age: data.max_age,
                last_interaction: now,
                mutated_namespaces: HashMap::new(),
                disposed: false,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acquire the session lock for the duration of one server call
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    /// Non-blocking acquire for the sweep
    pub fn try_lock(&self) -> Option<MutexGuard<'_, SessionState>> {
        self.state.try_lock()
    }
}

impl SessionState {
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Refresh the idle timeout; a later call may retune it
    pub fn set_max_age(&mut self, max_age: Duration) {
        self.max_age = Some(max_age);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stamp the last-interaction time
    pub fn touch(&mut self, now: Instant) {
        self.last_interaction = now;
    }

    /// Time since the last interaction
    pub fn idle(&self, now: Instant) -> Duration {
        now.duration_since(self.last_interaction)
    }

    /// Remember a namespace this session has committed changes into
    pub fn record_mutated_namespace(&mut self, namespace: Arc<Namespace>) {
        self.mutated_namespaces
            .entry(namespace.name().to_string())
            .or_insert(namespace);
    }

    pub fn mutated_namespace_count(&self) -> usize {
        self.mutated_namespaces.len()
    }

    /// Mark disposed and purge this session's variables from every
    /// namespace it mutated. Returns the number of variables purged.
    pub fn dispose(&mut self, session_id: &str) -> usize {
        self.disposed = true;
        let mut purged = 0;
        for (_, namespace) in self.mutated_namespaces.drain() {
            let _guard = namespace.lock();
            for table in namespace.tables() {
                purged += table.end_session(session_id);
            }
        }
        purged
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
