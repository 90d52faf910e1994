//! Full node composition.
//!
//! [`Node::new`] wires storage, wallet, mempool, chain, and network together
//! in dependency order; any failure here is fatal to the process. HTTP
//! handlers and inbound peer sockets are the only entry points afterwards,
//! and both go through the `Arc<Node>` handed out here.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use pyrite_core::chain::Chain;
use pyrite_core::error::{ChainError, StorageError};
use pyrite_core::mempool::Mempool;
use pyrite_core::storage::Storage;
use pyrite_network::Network;
use pyrite_wallet::{DiskFs, Wallet, WalletError};

use crate::api;
use crate::config::NodeConfig;
use crate::storage::RocksStore;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)] Storage(#[from] StorageError),
    #[error(transparent)] Wallet(#[from] WalletError),
    #[error(transparent)] Chain(#[from] ChainError),
    #[error("io: {0}")] Io(String),
}

/// A running node's long-lived state.
pub struct Node {
    pub config: NodeConfig,
    pub chain: Arc<Chain>,
    pub mempool: Arc<Mempool>,
    pub wallet: Arc<Wallet>,
    pub network: Arc<Network>,
}

impl Node {
    /// Open storage and the wallet, load or mine the chain, and assemble the
    /// gossip coordinator.
    pub fn new(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| NodeError::Io(e.to_string()))?;

        let store: Arc<dyn Storage> = Arc::new(RocksStore::open(config.db_path())?);
        let wallet = Arc::new(Wallet::load_or_create(&DiskFs, &config.wallet_path())?);
        let mempool = Arc::new(Mempool::new());
        let chain = Arc::new(Chain::load_or_create(store, &mempool, wallet.as_ref())?);
        let network = Network::new(Arc::clone(&chain), Arc::clone(&mempool), config.port);

        info!(
            port = config.port,
            address = %wallet.address(),
            height = chain.status().height,
            "node initialized"
        );

        Ok(Arc::new(Self { config, chain, mempool, wallet, network }))
    }

    /// Serve the HTTP API (and the `/ws` gossip endpoint) until the listener
    /// fails, re-announcing the newest block to peers on a fixed interval.
    pub async fn serve(self: Arc<Self>) -> Result<(), NodeError> {
        let app = api::router(Arc::clone(&self));
        let listener = tokio::net::TcpListener::bind(self.config.api_addr())
            .await
            .map_err(|e| NodeError::Io(e.to_string()))?;
        info!("listening on http://{}", self.config.api_addr());

        Arc::clone(&self.network).start_tickle(pyrite_network::gossip::TICKLE_INTERVAL);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .map_err(|e| NodeError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node() -> (Arc<Node>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig { data_dir: dir.path().to_path_buf(), ..Default::default() };
        let node = Node::new(config).unwrap();
        (node, dir)
    }

    #[test]
    fn boot_mines_genesis() {
        let (node, _dir) = test_node();
        let status = node.chain.status();
        assert_eq!(status.height, 1);
        assert!(status.last_hash.starts_with("00"));
        assert!(node.mempool.is_empty());
    }

    #[test]
    fn reboot_reuses_chain_and_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig { data_dir: dir.path().to_path_buf(), ..Default::default() };

        let first = Node::new(config.clone()).unwrap();
        let status = first.chain.status();
        let address = first.wallet.address().to_string();
        drop(first);

        let second = Node::new(config).unwrap();
        assert_eq!(second.chain.status(), status);
        assert_eq!(second.wallet.address(), address);
    }
}
