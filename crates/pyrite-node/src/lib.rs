//! # pyrite-node-lib
//! Full node composition: RocksDB storage, HTTP/JSON API, and the gossip
//! endpoint, assembled from the core, wallet, and network crates.

pub mod api;
pub mod config;
pub mod node;
pub mod storage;

pub use config::NodeConfig;
pub use node::{Node, NodeError};
