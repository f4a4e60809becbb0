//! Node and client configuration file formats.
//!
//! Configs are JSON files generated by `generate-config` or written by
//! hand. Private keys are referenced by path, never inlined; the MSP
//! config carries only public material.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LitefabError;

/// Which consensus module an orderer runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusKind {
    #[default]
    Solo,
    Raft,
}

fn default_channel() -> String {
    "default".to_string()
}

fn default_block_size() -> usize {
    crate::consensus::solo::DEFAULT_BLOCK_SIZE
}

fn default_block_timeout_ms() -> u64 {
    crate::consensus::solo::DEFAULT_BLOCK_TIMEOUT.as_millis() as u64
}

fn default_request_timeout_ms() -> u64 {
    5000
}

/// Configuration for a peer or orderer process.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// MSP identity this node signs as.
    pub node_id: String,
    /// Organization the identity belongs to.
    pub org_id: String,
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Directory holding the `ledger/` and `worldstate/` stores.
    pub data_dir: PathBuf,
    /// Channel namespace for world-state keys.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Path to this node's PKCS#8 PEM private key.
    pub private_key_path: PathBuf,
    /// Path to the shared MSP config.
    pub msp_path: PathBuf,
    /// Peer base URLs (orderers broadcast blocks here).
    #[serde(default)]
    pub peers: Vec<String>,
    /// Orderer base URLs (peers relay submissions here).
    #[serde(default)]
    pub orderers: Vec<String>,
    /// Consensus module for orderer processes.
    #[serde(default)]
    pub consensus: ConsensusKind,
    /// Transactions per block before an immediate cut.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// How long a partial batch may wait before being cut, in ms.
    #[serde(default = "default_block_timeout_ms")]
    pub block_timeout_ms: u64,
}

impl NodeConfig {
    /// Loads and parses a node config file.
    pub fn load(path: &Path) -> Result<Self, LitefabError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LitefabError::BadRequest(format!("reading config {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| LitefabError::BadRequest(format!("parsing config: {e}")))
    }

    /// `<data_dir>/ledger` path for the block store.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    /// `<data_dir>/worldstate` path for the state store.
    pub fn worldstate_path(&self) -> PathBuf {
        self.data_dir.join("worldstate")
    }

    pub fn block_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.block_timeout_ms)
    }
}

/// Configuration for the CLI client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// MSP identity the client signs as.
    pub client_id: String,
    /// Organization the identity belongs to.
    pub org_id: String,
    /// Path to the client's PKCS#8 PEM private key.
    pub private_key_path: PathBuf,
    /// Path to the shared MSP config.
    pub msp_path: PathBuf,
    /// Peer base URLs to gather endorsements from.
    pub peers: Vec<String>,
    /// Orderer base URLs to submit envelopes to.
    pub orderers: Vec<String>,
    /// Per-request timeout for peer and orderer calls, in ms.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    /// Loads and parses a client config file.
    pub fn load(path: &Path) -> Result<Self, LitefabError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LitefabError::BadRequest(format!("reading config {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| LitefabError::BadRequest(format!("parsing config: {e}")))
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}
