// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller contract violations
//!
//! Everything a transaction can legitimately run into at runtime (rejection,
//! expired session, failed statement, stopped server) is reported inside
//! [`LockTransactionResult`](crate::transaction::LockTransactionResult).
//! `ContractError` covers the remainder: malformed calls that indicate a
//! broken caller rather than a condition to recover from.

use thiserror::Error;
use uuid::Uuid;

/// A malformed call to the lock server
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("session id is blank")]
    BlankSessionId,

    #[error("transaction {0} carries statements but names no namespace")]
    BlankNamespace(Uuid),
}
