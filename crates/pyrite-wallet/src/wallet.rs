//! The wallet: one P-256 key loaded from (or first written to) a DER file.

use std::fmt;
use std::path::Path;

use p256::SecretKey;
use p256::ecdsa::SigningKey;
use tracing::info;

use pyrite_core::crypto;
use pyrite_core::error::CryptoError;
use pyrite_core::traits::Signer;

use crate::error::WalletError;
use crate::fs::WalletFs;

/// The node's wallet. Initialized once at startup and read-only thereafter;
/// the key is never rotated.
pub struct Wallet {
    key: SigningKey,
    address: String,
}

impl Wallet {
    /// Deserialize the key from the wallet file, or generate a fresh one and
    /// persist its SEC1 DER encoding on first boot.
    pub fn load_or_create(fs: &dyn WalletFs, path: &Path) -> Result<Self, WalletError> {
        let key = if fs.exists(path) {
            let der = fs.read(path)?;
            let secret = SecretKey::from_sec1_der(&der)
                .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
            SigningKey::from_bytes(&secret.to_bytes())
                .map_err(|e| WalletError::InvalidKey(e.to_string()))?
        } else {
            let key = crypto::generate_key();
            let secret = SecretKey::from_bytes(&key.to_bytes())
                .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
            let der = secret
                .to_sec1_der()
                .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
            fs.write(path, &der)?;
            info!(path = %path.display(), "created new wallet");
            key
        };
        let address = crypto::address_of(&key);
        Ok(Self { key, address })
    }

    /// Hex `X ‖ Y` address of the wallet key.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Signer for Wallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn sign(&self, hash_hex: &str) -> Result<String, CryptoError> {
        crypto::sign(&self.key, hash_hex)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{DiskFs, MemFs};
    use pyrite_core::codec::sha256_hex;
    use std::path::PathBuf;

    #[test]
    fn first_boot_creates_key_file() {
        let fs = MemFs::new();
        let path = PathBuf::from("node.wallet");
        let wallet = Wallet::load_or_create(&fs, &path).unwrap();
        assert!(fs.exists(&path));
        assert_eq!(wallet.address().len(), 128);
    }

    #[test]
    fn reload_restores_same_key() {
        let fs = MemFs::new();
        let path = PathBuf::from("node.wallet");
        let first = Wallet::load_or_create(&fs, &path).unwrap();
        let second = Wallet::load_or_create(&fs, &path).unwrap();
        assert_eq!(first.address(), second.address());
    }

    #[test]
    fn signatures_verify_and_tampering_fails() {
        let fs = MemFs::new();
        let wallet = Wallet::load_or_create(&fs, Path::new("w")).unwrap();
        let hash = sha256_hex(b"tx body");
        let sig = Signer::sign(&wallet, &hash).unwrap();
        assert!(crypto::verify(&hash, &sig, wallet.address()));

        let mut flipped: Vec<char> = hash.chars().collect();
        flipped[10] = if flipped[10] == 'a' { 'b' } else { 'a' };
        let flipped: String = flipped.into_iter().collect();
        assert!(!crypto::verify(&flipped, &sig, wallet.address()));
    }

    #[test]
    fn corrupt_wallet_file_is_rejected() {
        let fs = MemFs::new();
        let path = PathBuf::from("node.wallet");
        fs.write(&path, b"not a der key").unwrap();
        assert!(matches!(
            Wallet::load_or_create(&fs, &path),
            Err(WalletError::InvalidKey(_))
        ));
    }

    #[test]
    fn disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.wallet");
        let first = Wallet::load_or_create(&DiskFs, &path).unwrap();
        let second = Wallet::load_or_create(&DiskFs, &path).unwrap();
        assert_eq!(first.address(), second.address());
    }

    #[test]
    fn debug_hides_key_material() {
        let fs = MemFs::new();
        let wallet = Wallet::load_or_create(&fs, Path::new("w")).unwrap();
        let debug = format!("{wallet:?}");
        assert!(debug.contains("address"));
        assert!(!debug.contains("key"));
    }
}
