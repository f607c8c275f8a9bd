//! Node configuration with TOML file support.

use crate::NodeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vela_types::Network;

/// Configuration for a vela node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to join.
    #[serde(default = "default_network")]
    pub network: Network,

    /// Data directory holding the ledger environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// UDP/TCP port. Zero picks an ephemeral port (tests).
    #[serde(default)]
    pub port: u16,

    /// Peers to greet on startup, as `host:port` strings.
    #[serde(default)]
    pub preconfigured_peers: Vec<String>,

    /// Concurrent TCP connections used by a bootstrap attempt.
    #[serde(default = "default_bootstrap_connections")]
    pub bootstrap_connections: usize,

    /// Hex secret key this node votes with, when acting as representative.
    #[serde(default)]
    pub representative_key: Option<String>,

    /// Weight assumed online for quorum computation until measured.
    #[serde(default)]
    pub online_weight_raw: u64,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_network() -> Network {
    Network::Live
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./vela_data")
}

fn default_bootstrap_connections() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: default_data_dir(),
            port: default_network().default_port(),
            preconfigured_peers: Vec::new(),
            bootstrap_connections: default_bootstrap_connections(),
            representative_key: None,
            online_weight_raw: 0,
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl NodeConfig {
    /// A throwaway test-network config rooted at `data_dir`, with an
    /// ephemeral port.
    pub fn test(data_dir: &Path) -> Self {
        Self {
            network: Network::Test,
            data_dir: data_dir.to_path_buf(),
            port: 0,
            ..Self::default()
        }
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| NodeError::Config(format!("parsing {}: {e}", path.display())))
    }
}
