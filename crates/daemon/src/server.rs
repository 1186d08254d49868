// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::{debug, error};
use varlock_core::LockServer;

use crate::protocol::{
    self, ProtocolError, Request, Response, StatusReport, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};

/// State shared by every connection handler
#[derive(Clone)]
pub struct Handler {
    pub server: Arc<LockServer>,
    /// Signals the accept loop to shut down
    pub shutdown: mpsc::Sender<()>,
}

/// Handle a single client connection
pub async fn handle_connection(handler: Handler, stream: UnixStream) -> Result<(), ServerError> {
    // Split stream for reading/writing
    let (mut reader, mut writer) = stream.into_split();

    // Read request with timeout
    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(request) => request,
        Err(ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    // Handle request
    let response = handle_request(&handler, request).await;

    debug!("Sending response: {:?}", response);

    // Write response with timeout
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
async fn handle_request(handler: &Handler, request: Request) -> Response {
    match request {
        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Ping => Response::Pong,

        Request::Execute {
            session,
            transaction,
        } => match handler.server.execute_lock_transaction(&session, transaction) {
            Ok(result) => Response::Result { result },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::EndSession { session_id } => Response::SessionEnded {
            ended: handler.server.end_lock_session(&session_id),
        },

        Request::Status => {
            let server = &handler.server;
            Response::Status(Box::new(StatusReport {
                host: server.config().host.clone(),
                uptime_secs: server.uptime().as_secs(),
                trust_level: server.trust_level(),
                calls_norm: server.calls_norm(),
                sessions: server.session_count(),
                namespaces: server.namespace_count(),
                stats: server.stats().snapshot(),
            }))
        }

        Request::Shutdown => {
            let _ = handler.shutdown.send(()).await;
            Response::ShuttingDown
        }
    }
}

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request timeout")]
    Timeout,
}
