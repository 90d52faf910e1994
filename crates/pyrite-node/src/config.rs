//! Node configuration.

use std::path::PathBuf;

use pyrite_core::constants::DEFAULT_PORT;

/// Configuration for one node instance.
///
/// The listen port doubles as the node's identity: it parameterizes the
/// database name and is announced to peers as the dial-back port.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Port the HTTP API and WebSocket gossip endpoint listen on.
    pub port: u16,
    /// Directory holding the database and the wallet file.
    pub data_dir: PathBuf,
    /// Log level filter string (e.g. "info", "pyrite_node_lib=debug").
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("."),
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Path of this node's block database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(format!("blockchain_{}.db", self.port))
    }

    /// Path of the wallet key file.
    pub fn wallet_path(&self) -> PathBuf {
        self.data_dir.join("pyrite.wallet")
    }

    /// Socket address the HTTP server binds to.
    pub fn api_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
