//! Test-only helpers, exposed behind the `testing` feature so downstream
//! crates can use them in their own suites.

use p256::ecdsa::SigningKey;

use crate::crypto;
use crate::error::CryptoError;
use crate::traits::Signer;

/// A throwaway in-memory signing key.
pub struct TestSigner {
    key: SigningKey,
    address: String,
}

impl TestSigner {
    pub fn new() -> Self {
        let key = crypto::generate_key();
        let address = crypto::address_of(&key);
        Self { key, address }
    }
}

impl Default for TestSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for TestSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn sign(&self, hash_hex: &str) -> Result<String, CryptoError> {
        crypto::sign(&self.key, hash_hex)
    }
}
