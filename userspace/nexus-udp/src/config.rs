// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-layer settings, loaded from TOML. Every field has a default, so an empty file
//! (or no file) yields the stock behavior.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV: &str = "NEXUS_UDP_CONFIG";

pub const DEFAULT_SENDER_ADDR_PATH: &str = "/udp/sender/addr";
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UdpConfig {
    /// Bytes read by a single receive; longer datagrams are truncated by the OS.
    pub recv_buffer_bytes: usize,
    /// Address of the message carrying the sender of a received datagram. The composed
    /// receive program also binds the sender under this name.
    pub sender_addr_path: String,
    /// Nesting limit for commands invoking commands.
    pub max_call_depth: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            recv_buffer_bytes: nexus_net::RECV_BUFFER_BYTES,
            sender_addr_path: DEFAULT_SENDER_ADDR_PATH.to_string(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("invalid config: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

impl UdpConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: UdpConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads the file named by `NEXUS_UDP_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recv_buffer_bytes == 0 || self.recv_buffer_bytes > nexus_net::RECV_BUFFER_BYTES {
            return Err(ConfigError::Invalid {
                field: "recv_buffer_bytes",
                reason: "must be within 1..=65536",
            });
        }
        if !self.sender_addr_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "sender_addr_path",
                reason: "must start with '/'",
            });
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid { field: "max_call_depth", reason: "must be > 0" });
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(UdpConfig::from_toml_str(""), Ok(UdpConfig::default()));
        assert_eq!(UdpConfig::default().recv_buffer_bytes, 65_536);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let cfg = UdpConfig::from_toml_str("recv_buffer_bytes = 1500\n").expect("parse");
        assert_eq!(cfg.recv_buffer_bytes, 1500);
        assert_eq!(cfg.sender_addr_path, DEFAULT_SENDER_ADDR_PATH);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            UdpConfig::from_toml_str("recv_buffer_bytes = 0"),
            Err(ConfigError::Invalid { field: "recv_buffer_bytes", .. })
        ));
        assert!(matches!(
            UdpConfig::from_toml_str("sender_addr_path = \"udp\""),
            Err(ConfigError::Invalid { field: "sender_addr_path", .. })
        ));
        assert!(matches!(UdpConfig::from_toml_str("bogus = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_reads_file_and_roundtrips() {
        let cfg = UdpConfig { max_call_depth: 8, ..UdpConfig::default() };
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(cfg.to_toml_string().expect("serialize").as_bytes()).expect("write");
        assert_eq!(UdpConfig::load(file.path()), Ok(cfg));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = UdpConfig::load(&dir.path().join("absent.toml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
