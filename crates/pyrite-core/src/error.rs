//! Error types for the Pyrite chain.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("codec: {0}")]
pub struct CodecError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("storage: {0}")]
pub struct StorageError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid hex input")] InvalidHex,
    #[error("signing failed")] SigningFailed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error(transparent)] Storage(#[from] StorageError),
    #[error(transparent)] Codec(#[from] CodecError),
    #[error("block with given hash not found")] BlockNotFound,
    #[error("cannot replace chain with an empty block list")] EmptyChain,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("not enough funds to send specified amount")] InsufficientFunds,
    #[error("input references unknown output {tx_id}[{index}]")] UnknownInput { tx_id: String, index: i64 },
    #[error("signature on input {index} does not verify")] InvalidSignature { index: usize },
    #[error(transparent)] Chain(#[from] ChainError),
    #[error(transparent)] Codec(#[from] CodecError),
    #[error(transparent)] Crypto(#[from] CryptoError),
}
