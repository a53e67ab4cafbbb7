//! Key derivation and the scalar-walk primitive of the search loop.

use curve25519_dalek::edwards::EdwardsPoint;
use sha2::{Digest, Sha512};

use crate::matcher::PUBKEY_LEN;

/// Derive the Solana public key for a 32-byte secret seed.
///
/// SHA-512 the seed, clamp the low 32 bytes of the digest, multiply the base
/// point by the clamped scalar. `mul_base_clamped` applies the standard
/// clamp (clear the three low bits, clear bit 255, set bit 254) and performs
/// the multiplication without reducing the scalar again, matching the
/// Solana keypair convention.
#[inline]
pub fn derive_pubkey(seed: &[u8; 32]) -> [u8; PUBKEY_LEN] {
    let hash = Sha512::digest(seed);
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&hash[..32]);
    EdwardsPoint::mul_base_clamped(scalar).compress().to_bytes()
}

/// Base58-encode a public key into its address form.
pub fn pubkey_to_base58(pubkey: &[u8; PUBKEY_LEN]) -> String {
    bs58::encode(pubkey).into_string()
}

/// Advance the seed by one.
///
/// The seed is treated as a 256-bit integer whose low byte is byte 31, so
/// the carry runs from index 31 toward index 0. Wrapping past 2^256
/// continues from zero. Keep this convention: derived-key trajectories (and
/// the tests pinned to them) depend on it.
#[inline]
pub fn increment_key(key: &mut [u8; 32]) {
    for byte in key.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let seed = [7u8; 32];
        assert_eq!(derive_pubkey(&seed), derive_pubkey(&seed));
        assert_ne!(derive_pubkey(&seed), derive_pubkey(&[8u8; 32]));
    }

    /// The derivation must be byte-exact with the standard Ed25519 keypair
    /// path, checked against an independent implementation.
    #[test]
    fn test_derive_matches_ed25519_dalek() {
        for fill in [0u8, 1, 0x42, 0xFF] {
            let seed = [fill; 32];
            let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
            assert_eq!(
                derive_pubkey(&seed),
                signing_key.verifying_key().to_bytes()
            );
        }
    }

    #[test]
    fn test_increment_carries_from_byte_31() {
        let mut key = [0u8; 32];
        increment_key(&mut key);
        assert_eq!(key[31], 1);
        assert_eq!(key[..31], [0u8; 31]);

        let mut key = [0u8; 32];
        key[31] = 0xFF;
        increment_key(&mut key);
        assert_eq!(key[30], 1);
        assert_eq!(key[31], 0);
    }

    #[test]
    fn test_increment_wraps_at_key_space_end() {
        let mut key = [0xFF; 32];
        increment_key(&mut key);
        assert_eq!(key, [0u8; 32]);
    }

    #[test]
    fn test_address_round_trip() {
        let pubkey = derive_pubkey(&[3u8; 32]);
        let address = pubkey_to_base58(&pubkey);
        let decoded = bs58::decode(&address).into_vec().unwrap();
        assert_eq!(decoded, pubkey);
        assert!(address.len() >= 32 && address.len() <= 44);
    }
}
