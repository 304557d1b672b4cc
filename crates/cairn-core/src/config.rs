//! Configuration system for cairn.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CAIRN_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/cairn/config.toml
//!   3. ~/.config/cairn/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::wire;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    pub node: NodeSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// host:port this node binds for all traffic.
    pub listen: String,
    /// Static peer list, host:port each. Fixed for the process lifetime;
    /// the node's own address is filtered out at startup.
    pub peers: Vec<String>,
    /// Directory kept in sync. Top-level regular files only.
    pub root: PathBuf,
}

/// Protocol timing and sizing knobs. Process-wide constants, never
/// negotiated between peers — in particular every node must agree on
/// `chunk_size`, since the receiver trusts the sender's chunk count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub chunk_size: usize,
    pub ack_timeout_ms: u64,
    pub max_retries: u32,
    pub scan_interval_ms: u64,
    pub announce_interval_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            node: NodeSettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9400".to_string(),
            peers: Vec::new(),
            root: data_dir().join("sync"),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            chunk_size: wire::CHUNK_SIZE,
            ack_timeout_ms: wire::ACK_TIMEOUT_MS,
            max_retries: wire::MAX_RETRIES,
            scan_interval_ms: wire::SCAN_INTERVAL_MS,
            announce_interval_ms: wire::ANNOUNCE_INTERVAL_MS,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("cairn")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("cairn")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl CairnConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            CairnConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CAIRN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&CairnConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CAIRN_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CAIRN_NODE__LISTEN") {
            self.node.listen = v;
        }
        if let Ok(v) = std::env::var("CAIRN_NODE__PEERS") {
            self.node.peers = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(v) = std::env::var("CAIRN_NODE__ROOT") {
            self.node.root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CAIRN_SYNC__CHUNK_SIZE") {
            if let Ok(n) = v.parse() {
                self.sync.chunk_size = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_SYNC__ACK_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.sync.ack_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_SYNC__MAX_RETRIES") {
            if let Ok(n) = v.parse() {
                self.sync.max_retries = n;
            }
        }
    }
}
