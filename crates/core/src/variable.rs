// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-owned variable records
//!
//! A variable is immutable once constructed. It is created by a set
//! statement and only ever leaves a slot wholesale: deleted by its owner,
//! expired by the sweep, or purged when its owning session ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An immutable value entry owned by one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Session that created this variable
    pub session_id: String,
    /// Transaction that created this variable
    pub transaction_id: Uuid,
    /// When the variable was set
    pub set_at: DateTime<Utc>,
    /// Optional expiration; enforced only by the sweep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Optional caller-supplied description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The payload
    pub value: Value,
}

impl Variable {
    /// Create a new variable owned by the given session and transaction
    pub fn new(
        session_id: impl Into<String>,
        transaction_id: Uuid,
        value: Value,
        set_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            transaction_id,
            set_at,
            expires_at: None,
            description: None,
            value,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Whether the variable has outlived its expiration time
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether the variable is owned by the given session
    pub fn is_owned_by(&self, session_id: &str) -> bool {
        self.session_id == session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn variable(value: Value) -> Variable {
        Variable::new("sess-1", Uuid::new_v4(), value, Utc::now())
    }

    #[test]
    fn variable_without_expiry_never_expires() {
        let var = variable(Value::from(1));
        assert!(!var.is_expired(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn variable_expires_at_or_after_deadline() {
        let now = Utc::now();
        let var = variable(Value::from(1)).with_expires_at(Some(now + Duration::seconds(30)));

        assert!(!var.is_expired(now));
        assert!(var.is_expired(now + Duration::seconds(30)));
        assert!(var.is_expired(now + Duration::seconds(31)));
    }

    #[test]
    fn ownership_is_by_session_id() {
        let var = variable(Value::from("x"));
        assert!(var.is_owned_by("sess-1"));
        assert!(!var.is_owned_by("sess-2"));
    }
}
