//! Shared harness: an in-process daemon on a temp-dir socket

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use varlock_core::{LockServer, ServerConfig};
use varlock_daemon::protocol::{self, Request, Response};
use varlock_daemon::server::{handle_connection, Handler};

pub struct TestDaemon {
    pub server: Arc<LockServer>,
    pub socket_path: PathBuf,
    // Held for the lifetime of the daemon; the socket dir dies with it
    _dir: TempDir,
}

impl TestDaemon {
    /// Bind a socket in a fresh temp dir and run the accept loop
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let socket_path = dir.path().join("varlockd.sock");

        let server = Arc::new(LockServer::new(
            ServerConfig::new()
                .with_host("spec-node")
                .with_default_session_max_age(Duration::from_secs(60)),
        ));
        let listener = tokio::net::UnixListener::bind(&socket_path).expect("bind socket");

        let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
        let handler = Handler {
            server: Arc::clone(&server),
            shutdown: shutdown_tx,
        };

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let handler = handler.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(handler, stream).await;
                });
            }
        });

        Self {
            server,
            socket_path,
            _dir: dir,
        }
    }

    /// Send one request over a fresh connection
    pub async fn request(&self, request: Request) -> Response {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .expect("connect to daemon");
        let (mut reader, mut writer) = stream.into_split();

        protocol::write_request(&mut writer, &request, Duration::from_secs(5))
            .await
            .expect("write request");
        protocol::read_response(&mut reader, Duration::from_secs(5))
            .await
            .expect("read response")
    }
}
