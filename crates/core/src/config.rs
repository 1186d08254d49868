// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration

use crate::trust;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lock server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host label stamped into every transaction result
    #[serde(default = "default_host")]
    pub host: String,
    /// Idle timeout applied to sessions that do not specify their own
    #[serde(default = "default_session_max_age", with = "humantime_serde")]
    pub default_session_max_age: Duration,
    /// Multiplicative call-norm decay per sweep tick
    #[serde(default = "default_trust_decay")]
    pub trust_decay: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            default_session_max_age: default_session_max_age(),
            trust_decay: default_trust_decay(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_default_session_max_age(mut self, max_age: Duration) -> Self {
        self.default_session_max_age = max_age;
        self
    }

    pub fn with_trust_decay(mut self, decay: f64) -> Self {
        self.trust_decay = decay;
        self
    }
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_session_max_age() -> Duration {
    Duration::from_secs(900)
}

fn default_trust_decay() -> f64 {
    trust::DEFAULT_DECAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ServerConfig::default();
        assert_eq!(config.default_session_max_age, Duration::from_secs(900));
        assert_eq!(config.trust_decay, trust::DEFAULT_DECAY);
        assert!(!config.host.is_empty());
    }

    #[test]
    fn builders_override_fields() {
        let config = ServerConfig::new()
            .with_host("node-1")
            .with_default_session_max_age(Duration::from_secs(60))
            .with_trust_decay(0.5);

        assert_eq!(config.host, "node-1");
        assert_eq!(config.default_session_max_age, Duration::from_secs(60));
        assert_eq!(config.trust_decay, 0.5);
    }

    #[test]
    fn durations_deserialize_from_humantime() {
        let config: ServerConfig = toml_like(r#"{"default_session_max_age": "2m"}"#);
        assert_eq!(config.default_session_max_age, Duration::from_secs(120));
    }

    fn toml_like(json: &str) -> ServerConfig {
        serde_json::from_str(json).unwrap()
    }
}
