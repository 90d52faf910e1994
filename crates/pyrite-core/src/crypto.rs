//! ECDSA P-256 signing and verification.
//!
//! Transaction ids are hex SHA-256 strings; signing operates on the decoded
//! 32-byte digest directly (prehash mode). A signature is the fixed-width
//! `r ‖ s` byte pair, hex-encoded, and an address is the uncompressed public
//! key's `X ‖ Y` coordinates, hex-encoded. Verification tolerates arbitrary
//! malformed input by returning `false`.

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::{EncodedPoint, FieldBytes};

use crate::error::CryptoError;

/// Generate a fresh signing key from the OS cryptographic RNG.
pub fn generate_key() -> SigningKey {
    SigningKey::random(&mut rand::rngs::OsRng)
}

/// Hex `X ‖ Y` address for a signing key (128 hex chars on P-256).
pub fn address_of(key: &SigningKey) -> String {
    let point = key.verifying_key().to_encoded_point(false);
    // uncompressed SEC1 layout is tag || X || Y
    hex::encode(&point.as_bytes()[1..])
}

/// Sign a hex-encoded hash, returning the hex `r ‖ s` signature.
pub fn sign(key: &SigningKey, hash_hex: &str) -> Result<String, CryptoError> {
    let digest = hex::decode(hash_hex).map_err(|_| CryptoError::InvalidHex)?;
    let signature: Signature = key
        .sign_prehash(&digest)
        .map_err(|_| CryptoError::SigningFailed)?;
    Ok(hex::encode(signature.to_bytes()))
}

/// Verify a hex `r ‖ s` signature over a hex hash against a hex `X ‖ Y`
/// address. Never panics; any malformed input yields `false`.
pub fn verify(hash_hex: &str, signature_hex: &str, address_hex: &str) -> bool {
    verify_inner(hash_hex, signature_hex, address_hex).is_some()
}

fn verify_inner(hash_hex: &str, signature_hex: &str, address_hex: &str) -> Option<()> {
    let digest = hex::decode(hash_hex).ok()?;
    let sig_bytes = hex::decode(signature_hex).ok()?;
    let addr_bytes = hex::decode(address_hex).ok()?;

    let (r, s) = split_scalars(&sig_bytes)?;
    let signature = Signature::from_scalars(r, s).ok()?;

    let (x, y) = split_scalars(&addr_bytes)?;
    let point = EncodedPoint::from_affine_coordinates(&x, &y, false);
    let key = VerifyingKey::from_encoded_point(&point).ok()?;

    key.verify_prehash(&digest, &signature).ok()
}

/// Split a byte pair in half and left-pad each half to a 32-byte big-endian
/// field element (mirrors big-integer decoding of the two hex halves).
fn split_scalars(bytes: &[u8]) -> Option<(FieldBytes, FieldBytes)> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return None;
    }
    let half = bytes.len() / 2;
    if half > 32 {
        return None;
    }
    let mut r = FieldBytes::default();
    let mut s = FieldBytes::default();
    r[32 - half..].copy_from_slice(&bytes[..half]);
    s[32 - half..].copy_from_slice(&bytes[half..]);
    Some((r, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::sha256_hex;

    #[test]
    fn address_is_128_hex_chars() {
        let key = generate_key();
        let addr = address_of(&key);
        assert_eq!(addr.len(), 128);
        assert!(addr.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn sign_then_verify() {
        let key = generate_key();
        let hash = sha256_hex(b"payload");
        let sig = sign(&key, &hash).unwrap();
        assert_eq!(sig.len(), 128);
        assert!(verify(&hash, &sig, &address_of(&key)));
    }

    #[test]
    fn flipped_digest_fails() {
        let key = generate_key();
        let hash = sha256_hex(b"payload");
        let sig = sign(&key, &hash).unwrap();

        // flip the first hex digit of the hash
        let mut flipped: Vec<char> = hash.chars().collect();
        flipped[0] = if flipped[0] == '0' { '1' } else { '0' };
        let flipped: String = flipped.into_iter().collect();
        assert!(!verify(&flipped, &sig, &address_of(&key)));
    }

    #[test]
    fn wrong_key_fails() {
        let key = generate_key();
        let other = generate_key();
        let hash = sha256_hex(b"payload");
        let sig = sign(&key, &hash).unwrap();
        assert!(!verify(&hash, &sig, &address_of(&other)));
    }

    #[test]
    fn malformed_inputs_return_false() {
        let key = generate_key();
        let hash = sha256_hex(b"payload");
        let sig = sign(&key, &hash).unwrap();
        let addr = address_of(&key);

        assert!(!verify("not hex", &sig, &addr));
        assert!(!verify(&hash, "zz", &addr));
        assert!(!verify(&hash, &sig, "zz"));
        assert!(!verify(&hash, "", &addr));
        assert!(!verify(&hash, &sig, ""));
        assert!(!verify(&hash, &sig, &"ab".repeat(100)));
    }

    #[test]
    fn sign_rejects_non_hex_hash() {
        let key = generate_key();
        assert_eq!(sign(&key, "not hex").unwrap_err(), CryptoError::InvalidHex);
    }
}
