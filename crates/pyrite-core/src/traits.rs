//! Seams between the chain core and its collaborators.

use crate::error::CryptoError;

/// Something that can sign transaction ids with the local wallet key.
///
/// The chain and mempool only need an address to pay rewards to and a way to
/// sign a hex hash; keeping this behind a trait keeps key storage out of the
/// core and lets tests inject throwaway keys.
pub trait Signer: Send + Sync {
    /// Hex `X ‖ Y` address of the signing key.
    fn address(&self) -> String;

    /// Sign a hex-encoded hash, returning the hex `r ‖ s` signature.
    fn sign(&self, hash_hex: &str) -> Result<String, CryptoError>;
}
