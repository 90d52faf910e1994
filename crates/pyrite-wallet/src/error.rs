//! Wallet error types.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet file {path}: {message}")] Io { path: String, message: String },
    #[error("invalid wallet key: {0}")] InvalidKey(String),
}
