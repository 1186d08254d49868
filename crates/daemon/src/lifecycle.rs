// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};
use varlock_core::{LockServer, ServerConfig, SweepConfig, Sweeper};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Path to the lock/PID file
    pub lock_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
    /// Lock server settings
    pub server: ServerConfig,
    /// Sweep loop settings
    pub sweep: SweepConfig,
}

/// Optional settings file (TOML), merged over the defaults
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Settings {
    socket_path: Option<PathBuf>,
    #[serde(default)]
    server: Option<ServerConfig>,
    #[serde(default)]
    sweep: Option<SweepConfig>,
}

impl Config {
    /// Build configuration from the environment plus an optional settings
    /// file
    pub fn load(settings_path: Option<&Path>) -> Result<Self, LifecycleError> {
        let settings = match settings_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| LifecycleError::SettingsRead(path.to_path_buf(), e))?;
                toml::from_str::<Settings>(&content)
                    .map_err(|e| LifecycleError::SettingsParse(path.to_path_buf(), e))?
            }
            None => Settings::default(),
        };

        let state_dir = state_dir()?;
        let socket_path = settings
            .socket_path
            .unwrap_or(socket_dir()?.join("varlockd.sock"));

        Ok(Self {
            socket_path,
            lock_path: state_dir.join("varlockd.pid"),
            log_path: state_dir.join("varlockd.log"),
            server: settings.server.unwrap_or_default(),
            sweep: settings.sweep.unwrap_or_default(),
        })
    }
}

/// Daemon state during operation
pub struct Daemon {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// The lock server, shared with connection handlers
    pub server: Arc<LockServer>,
    /// Background sweep thread
    sweeper: Sweeper,
}

impl Daemon {
    /// Shutdown the daemon gracefully
    pub fn shutdown(self) {
        info!("Shutting down daemon...");

        // 1. Stop the server; in-flight calls return failed results
        self.server.stop();

        // 2. Wake the sweep thread and join it
        self.sweeper.stop();

        // 3. Remove socket file
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 4. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 5. Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to read settings at {0}: {1}")]
    SettingsRead(PathBuf, std::io::Error),

    #[error("Failed to parse settings at {0}: {1}")]
    SettingsParse(PathBuf, toml::de::Error),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Failed to start sweep thread: {0}")]
    SweepSpawn(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    match startup_inner(config) {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
fn startup_inner(config: &Config) -> Result<Daemon, LifecycleError> {
    // 1. Create directories for socket and state files
    for path in [&config.socket_path, &config.lock_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // 2. Acquire the lock file FIRST - prevents races
    let lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Reborrow as immutable

    // 3. Remove stale socket and bind
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 4. Create the server and start the sweep thread
    let server = Arc::new(LockServer::new(config.server.clone()));
    let sweeper = Sweeper::spawn(Arc::clone(&server), config.sweep.clone())
        .map_err(LifecycleError::SweepSpawn)?;

    info!(
        host = %config.server.host,
        socket = %config.socket_path.display(),
        "Daemon started"
    );

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        listener,
        server,
        sweeper,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the state directory for varlock
fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("VARLOCK_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("varlock"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/varlock"))
}

/// Get the socket directory for varlock
///
/// Uses /tmp/varlock by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with VARLOCK_SOCKET_DIR for testing.
fn socket_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("VARLOCK_SOCKET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(PathBuf::from("/tmp/varlock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_with_humantime_durations() {
        let settings: Settings = toml::from_str(
            r#"
            socket_path = "/tmp/test/varlockd.sock"

            [server]
            host = "node-1"
            default_session_max_age = "5m"
            trust_decay = 0.9

            [sweep]
            interval = "2s"
            jitter = false
            "#,
        )
        .unwrap();

        let server = settings.server.unwrap();
        assert_eq!(server.host, "node-1");
        assert_eq!(
            server.default_session_max_age,
            std::time::Duration::from_secs(300)
        );
        let sweep = settings.sweep.unwrap();
        assert_eq!(sweep.interval, std::time::Duration::from_secs(2));
        assert!(!sweep.jitter);
    }

    #[test]
    fn empty_settings_use_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert!(settings.socket_path.is_none());
        assert!(settings.server.is_none());
        assert!(settings.sweep.is_none());
    }

    #[test]
    fn unknown_settings_keys_are_rejected() {
        let result = toml::from_str::<Settings>("unknown_key = 1");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn startup_binds_socket_and_writes_pid() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            socket_path: dir.path().join("varlockd.sock"),
            lock_path: dir.path().join("varlockd.pid"),
            log_path: dir.path().join("varlockd.log"),
            server: ServerConfig::default(),
            sweep: SweepConfig::default(),
        };

        let daemon = startup(&config).unwrap();
        assert!(daemon.config.socket_path.exists());
        let pid = std::fs::read_to_string(&daemon.config.lock_path).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());

        let socket_path = daemon.config.socket_path.clone();
        daemon.shutdown();
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn second_startup_fails_on_held_lock() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            socket_path: dir.path().join("varlockd.sock"),
            lock_path: dir.path().join("varlockd.pid"),
            log_path: dir.path().join("varlockd.log"),
            server: ServerConfig::default(),
            sweep: SweepConfig::default(),
        };

        let daemon = startup(&config).unwrap();
        let second = startup(&config);
        assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
        daemon.shutdown();
    }
}
