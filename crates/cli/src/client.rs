// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UnixStream;
use tracing::debug;
use varlock_daemon::protocol::{self, ProtocolError, Request, Response};

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("VARLOCK_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running (no socket at {0})")]
    DaemonNotRunning(PathBuf),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Daemon error: {0}")]
    Daemon(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to an existing daemon
    pub fn connect(socket_path: Option<PathBuf>) -> Result<Self, ClientError> {
        let socket_path = socket_path.unwrap_or_else(default_socket_path);

        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning(socket_path));
        }

        Ok(Self { socket_path })
    }

    /// Send one request and read the response
    pub async fn request(&self, request: Request) -> Result<Response, ClientError> {
        debug!(socket = %self.socket_path.display(), "sending {:?}", request);
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        protocol::write_request(&mut writer, &request, timeout_ipc()).await?;
        let response = protocol::read_response(&mut reader, timeout_ipc()).await?;
        debug!("received {:?}", response);

        match response {
            Response::Error { message } => Err(ClientError::Daemon(message)),
            other => Ok(other),
        }
    }
}

/// Socket path used when none is given on the command line
pub fn default_socket_path() -> PathBuf {
    if let Ok(dir) = std::env::var("VARLOCK_SOCKET_DIR") {
        return PathBuf::from(dir).join("varlockd.sock");
    }
    PathBuf::from("/tmp/varlock/varlockd.sock")
}
