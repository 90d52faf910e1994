//! # pyrite-wallet
//! The node's persistent ECDSA P-256 wallet: one key, created on first boot,
//! stored as SEC1 DER next to the chain data.

pub mod error;
pub mod fs;
pub mod wallet;

pub use error::WalletError;
pub use fs::{DiskFs, WalletFs};
pub use wallet::Wallet;
