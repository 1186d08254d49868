// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Statement contract and the built-in statement catalog
//!
//! A statement is the unit of work inside a lock transaction. `prepare`
//! runs outside the namespace lock and must not mutate shared state: it
//! validates the statement and resolves its table into the context.
//! `execute` performs the effect under the namespace lock and signals
//! expected failures through [`EvalContext::abort`] rather than an error
//! return; the orchestrator stops at the first aborted statement and rolls
//! every touched table back.
//!
//! The built-in catalog maps one-to-one onto the table primitives. The
//! canonical mutex-acquire composition is `require absent` followed by
//! `set` in a single transaction.

use crate::context::EvalContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// The contract every statement in a transaction satisfies
pub trait Statement {
    /// Validate and resolve; runs in order, outside the namespace lock
    fn prepare(&mut self, ctx: &mut EvalContext);

    /// Apply the effect; runs in order under the namespace lock
    fn execute(&mut self, ctx: &mut EvalContext);

    /// Short human-readable description, surfaced on failure
    fn describe(&self) -> String;
}

/// A statement from the built-in catalog, addressing one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockStatement {
    pub table: String,
    #[serde(flatten)]
    pub op: LockOp,
}

/// The built-in operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LockOp {
    /// Create a variable; fails when the name is taken and duplicates are
    /// not allowed
    Set {
        name: String,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, with = "humantime_serde::option")]
        ttl: Option<Duration>,
        #[serde(default)]
        allow_duplicates: bool,
    },
    /// Remove the calling session's variables under a name; fails when
    /// `required` and nothing matched
    Delete {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default)]
        required: bool,
    },
    /// Copy the matching variable value(s) into the output data; fails
    /// when `required` and nothing matched
    Fetch {
        name: String,
        /// Output key; defaults to the variable name
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        #[serde(default)]
        many: bool,
        #[serde(default)]
        ignore_self: bool,
        #[serde(default)]
        required: bool,
    },
    /// Assert that a matching variable exists (or is absent)
    Require {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default)]
        absent: bool,
        #[serde(default)]
        ignore_self: bool,
    },
}

impl LockStatement {
    pub fn set(table: impl Into<String>, name: impl Into<String>, value: Value) -> Self {
        Self {
            table: table.into(),
            op: LockOp::Set {
                name: name.into(),
                value,
                description: None,
                ttl: None,
                allow_duplicates: false,
            },
        }
    }

    pub fn delete(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            op: LockOp::Delete {
                name: name.into(),
                value: None,
                required: false,
            },
        }
    }

    pub fn fetch(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            op: LockOp::Fetch {
                name: name.into(),
                output: None,
                many: false,
                ignore_self: false,
                required: false,
            },
        }
    }

    pub fn require_absent(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            op: LockOp::Require {
                name: name.into(),
                value: None,
                absent: true,
                ignore_self: false,
            },
        }
    }

    fn variable_name(&self) -> &str {
        match &self.op {
            LockOp::Set { name, .. }
            | LockOp::Delete { name, .. }
            | LockOp::Fetch { name, .. }
            | LockOp::Require { name, .. } => name,
        }
    }
}

impl Statement for LockStatement {
    fn prepare(&mut self, ctx: &mut EvalContext) {
        if self.table.trim().is_empty() {
            ctx.abort(format!("{}: blank table name", self.describe()));
            return;
        }
        if self.variable_name().trim().is_empty() {
            ctx.abort(format!("{}: blank variable name", self.describe()));
            return;
        }
        ctx.resolve_table(&self.table);
    }

    fn execute(&mut self, ctx: &mut EvalContext) {
        let table = ctx.resolve_table(&self.table);
        match &self.op {
            LockOp::Set {
                name,
                value,
                description,
                ttl,
                allow_duplicates,
            } => {
                // out-of-range TTLs mean no expiry
                let expires_at = ttl
                    .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
                    .map(|ttl| ctx.now_utc() + ttl);
                let set = table.set_variable(
                    ctx,
                    name,
                    value.clone(),
                    description.clone(),
                    expires_at,
                    *allow_duplicates,
                );
                if !set {
                    ctx.abort(format!("{}: variable already present", self.describe()));
                }
            }

            LockOp::Delete {
                name,
                value,
                required,
            } => {
                let deleted = table.delete_variable(ctx, name, value.as_ref());
                if *required && !deleted {
                    ctx.abort(format!("{}: nothing to delete", self.describe()));
                }
            }

            LockOp::Fetch {
                name,
                output,
                many,
                ignore_self,
                required,
            } => {
                let key = output.clone().unwrap_or_else(|| name.clone());
                if *many {
                    let variables = table.get_variables(ctx, name, *ignore_self);
                    if *required && variables.is_empty() {
                        ctx.abort(format!("{}: no variables found", self.describe()));
                        return;
                    }
                    let values: Vec<Value> =
                        variables.into_iter().map(|v| v.value).collect();
                    ctx.add_data(key, Value::Array(values));
                } else {
                    match table.get_variable(ctx, name, *ignore_self) {
                        Some(variable) => ctx.add_data(key, variable.value),
                        None if *required => {
                            ctx.abort(format!("{}: no variable found", self.describe()));
                        }
                        None => {}
                    }
                }
            }

            LockOp::Require {
                name,
                value,
                absent,
                ignore_self,
            } => {
                let found = match value {
                    Some(value) => table.exists(ctx, name, value, *ignore_self),
                    None => table.get_variable(ctx, name, *ignore_self).is_some(),
                };
                if found == *absent {
                    let reason = if *absent { "already present" } else { "missing" };
                    ctx.abort(format!("{}: {}", self.describe(), reason));
                }
            }
        }
    }

    fn describe(&self) -> String {
        let target = format!("{}/{}", self.table, self.variable_name());
        match &self.op {
            LockOp::Set { .. } => format!("set {}", target),
            LockOp::Delete { .. } => format!("delete {}", target),
            LockOp::Fetch { .. } => format!("fetch {}", target),
            LockOp::Require { absent: true, .. } => format!("require absent {}", target),
            LockOp::Require { .. } => format!("require {}", target),
        }
    }
}

#[cfg(test)]
#[path = "statement_tests.rs"]
mod tests;
