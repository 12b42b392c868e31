//! Node configuration file.
//!
//! ```toml
//! [book]
//! state_file = "./data/execution_book.json"
//! book_size = 0
//!
//! [rpc]
//! listen_addr = "127.0.0.1:8645"
//! submit_requests_per_sec = 200
//! submit_burst = 400
//!
//! [[sequencers]]
//! id = "seq1"
//! key_type = "ed25519"
//! public_key = "<hex>"
//! ```

use crate::rpc::RateLimitConfig;
use execbook_book::BookConfig;
use execbook_types::{KeyError, KeyType, PublicKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or interpreting a node configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid key for sequencer {id}: {source}")]
    SequencerKey {
        id: String,
        #[source]
        source: KeyError,
    },

    #[error("sequencer {0} is configured more than once")]
    DuplicateSequencer(String),

    #[error("sequencer id cannot be empty")]
    EmptySequencerId,
}

/// Top-level node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub book: BookSection,

    #[serde(default)]
    pub rpc: RpcSection,

    #[serde(default)]
    pub sequencers: Vec<SequencerEntry>,
}

/// `[book]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSection {
    /// Snapshot path. Omit to run without persistence.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Pending-record cap; zero or negative means unlimited.
    #[serde(default)]
    pub book_size: i64,
}

/// `[rpc]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSection {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Sustained submissions per second allowed per client address.
    #[serde(default = "default_submit_requests_per_sec")]
    pub submit_requests_per_sec: u32,

    /// Submissions a client may send in a burst.
    #[serde(default = "default_submit_burst")]
    pub submit_burst: u32,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            submit_requests_per_sec: default_submit_requests_per_sec(),
            submit_burst: default_submit_burst(),
        }
    }
}

impl RpcSection {
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_sec: self.submit_requests_per_sec,
            burst: self.submit_burst,
            ..RateLimitConfig::default()
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8645))
}

fn default_submit_requests_per_sec() -> u32 {
    RateLimitConfig::default().requests_per_sec
}

fn default_submit_burst() -> u32 {
    RateLimitConfig::default().burst
}

/// One `[[sequencers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerEntry {
    pub id: String,

    /// `ed25519` (default) or `secp256k1`.
    #[serde(default)]
    pub key_type: String,

    /// Public key, lowercase hex.
    pub public_key: String,
}

impl SequencerEntry {
    pub fn decode_key(&self) -> Result<PublicKey, ConfigError> {
        let key_error = |source| ConfigError::SequencerKey {
            id: self.id.clone(),
            source,
        };
        let key_type: KeyType = self.key_type.parse().map_err(key_error)?;
        PublicKey::from_hex(key_type, &self.public_key).map_err(key_error)
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Decode sequencer keys and build the book configuration.
    pub fn to_book_config(&self) -> Result<BookConfig, ConfigError> {
        let mut config = BookConfig::default().with_book_size(self.book.book_size);
        if let Some(path) = &self.book.state_file {
            config = config.with_state_file(path);
        }

        for entry in &self.sequencers {
            if entry.id.is_empty() {
                return Err(ConfigError::EmptySequencerId);
            }
            if config.sequencer_keys.contains_key(&entry.id) {
                return Err(ConfigError::DuplicateSequencer(entry.id.clone()));
            }
            let key = entry.decode_key()?;
            config = config.with_sequencer(entry.id.clone(), key);
        }
        Ok(config)
    }
}
