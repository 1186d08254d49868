// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! varlock-daemon: socket transport for the lock server
//!
//! Exposes the daemon lifecycle, the wire protocol and the connection
//! handler as a library so clients and end-to-end tests can drive the
//! daemon in-process.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use lifecycle::{startup, Config, Daemon, LifecycleError};
pub use protocol::{Request, Response, StatusReport};
pub use server::{handle_connection, Handler, ServerError};
