//! Hashing and encoding helpers.
//!
//! Persistence and hashing use the bincode standard config; the HTTP and
//! gossip surfaces use serde_json and never pass through here. Hashes are
//! lowercase hex SHA-256.

use bincode::{Decode, Encode};
use sha2::{Digest, Sha256};

use crate::error::CodecError;

/// Encode a value with the bincode standard config.
pub fn to_bytes<T: Encode>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| CodecError(e.to_string()))
}

/// Decode a value previously written by [`to_bytes`].
pub fn from_bytes<T: Decode<()>>(bytes: &[u8]) -> Result<T, CodecError> {
    let (value, _) = bincode::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| CodecError(e.to_string()))?;
    Ok(value)
}

/// Lowercase hex SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hash of a value's binary encoding.
pub fn hash_of<T: Encode>(value: &T) -> Result<String, CodecError> {
    Ok(sha256_hex(&to_bytes(value)?))
}

/// Current Unix time in seconds.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Encode, Decode, Debug, PartialEq, Eq, Clone)]
    struct Sample {
        name: String,
        height: u64,
        index: i64,
    }

    #[test]
    fn round_trip_struct() {
        let s = Sample { name: "genesis".into(), height: 1, index: -1 };
        let bytes = to_bytes(&s).unwrap();
        let back: Sample = from_bytes(&bytes).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(from_bytes::<Sample>(&[0xFF; 3]).is_err());
    }

    #[test]
    fn sha256_known_vector() {
        // sha256("") is a fixed vector
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let s = Sample { name: "x".into(), height: 0, index: 0 };
        let h = hash_of(&s).unwrap();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_changes_with_data() {
        let a = Sample { name: "a".into(), height: 1, index: 0 };
        let b = Sample { name: "b".into(), height: 1, index: 0 };
        assert_ne!(hash_of(&a).unwrap(), hash_of(&b).unwrap());
    }

    proptest! {
        #[test]
        fn round_trip_arbitrary(name in ".{0,64}", height in any::<u64>(), index in any::<i64>()) {
            let s = Sample { name, height, index };
            let back: Sample = from_bytes(&to_bytes(&s).unwrap()).unwrap();
            prop_assert_eq!(s, back);
        }
    }
}
