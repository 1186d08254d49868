// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock transaction request and result types
//!
//! A transaction with no statements is a ping: it refreshes the session's
//! last-interaction time and nothing else. Every expected failure mode is
//! a typed result field; results never carry errors as exceptions across
//! the service boundary.

use crate::statement::LockStatement;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An ordered batch of statements executed with all-or-nothing effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockTransaction<S = LockStatement> {
    pub id: Uuid,
    /// Namespace the statements run against; compared case-insensitively.
    /// May be blank on a ping.
    #[serde(default)]
    pub namespace: String,
    /// `None` denotes a ping (session keep-alive only)
    #[serde(default = "Option::default")]
    pub statements: Option<Vec<S>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reject unless the server has been up at least this long
    #[serde(default)]
    pub minimum_required_runtime_secs: u64,
    /// Reject unless the server trust level is at least this high
    #[serde(default)]
    pub minimum_required_trust_level: f64,
}

impl<S> LockTransaction<S> {
    pub fn new(id: Uuid, namespace: impl Into<String>, statements: Vec<S>) -> Self {
        Self {
            id,
            namespace: namespace.into(),
            statements: Some(statements),
            description: None,
            minimum_required_runtime_secs: 0,
            minimum_required_trust_level: 0.0,
        }
    }

    /// A keep-alive carrying no statements
    pub fn ping(id: Uuid) -> Self {
        Self {
            id,
            namespace: String::new(),
            statements: None,
            description: None,
            minimum_required_runtime_secs: 0,
            minimum_required_trust_level: 0.0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_minimum_runtime_secs(mut self, secs: u64) -> Self {
        self.minimum_required_runtime_secs = secs;
        self
    }

    pub fn with_minimum_trust_level(mut self, level: f64) -> Self {
        self.minimum_required_trust_level = level;
        self
    }

    pub fn is_ping(&self) -> bool {
        self.statements.is_none()
    }
}

/// Transaction outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Ok,
    Error,
}

/// Why a transaction did not succeed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCause {
    /// No specific cause (also used when the server is not running)
    #[default]
    Unspecified,
    /// Rejected before touching any state: the server is not up long
    /// enough or not trusted enough
    MinimumRequirements,
    /// The session was disposed between resolution and use
    SessionExpired,
    /// A statement aborted; every touched table was rolled back
    Statement,
}

/// Result of one `execute_lock_transaction` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockTransactionResult {
    pub transaction_id: Uuid,
    pub server_host: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub error_cause: ErrorCause,
    /// Description of the first failed statement, when `error_cause` is
    /// `Statement`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_statement: Option<String>,
    /// Server uptime in whole seconds at the time of the call
    pub runtime_secs: u64,
    pub trust_level: f64,
    /// Output data collected by the statements, in statement order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<(String, Value)>,
}

impl LockTransactionResult {
    pub fn is_ok(&self) -> bool {
        self.status == TransactionStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_statements_field_is_a_ping() {
        let json = json!({ "id": Uuid::new_v4() });
        let transaction: LockTransaction = serde_json::from_value(json).unwrap();
        assert!(transaction.is_ping());
        assert_eq!(transaction.namespace, "");
    }

    #[test]
    fn empty_statement_list_is_not_a_ping() {
        let transaction: LockTransaction =
            LockTransaction::new(Uuid::new_v4(), "orders", Vec::new());
        assert!(!transaction.is_ping());
    }

    #[test]
    fn result_serde_roundtrip() {
        let result = LockTransactionResult {
            transaction_id: Uuid::new_v4(),
            server_host: "node-1".to_string(),
            status: TransactionStatus::Error,
            error_cause: ErrorCause::Statement,
            failed_statement: Some("set jobs/x: variable already present".to_string()),
            runtime_secs: 42,
            trust_level: 0.75,
            data: vec![("x".to_string(), json!(1))],
        };

        let encoded = serde_json::to_string(&result).unwrap();
        let back: LockTransactionResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn error_cause_defaults_to_unspecified() {
        let json = json!({
            "transaction_id": Uuid::new_v4(),
            "server_host": "node-1",
            "status": "ok",
            "runtime_secs": 0,
            "trust_level": 1.0,
        });
        let result: LockTransactionResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.error_cause, ErrorCause::Unspecified);
        assert!(result.is_ok());
    }
}
