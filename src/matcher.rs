//! Compiling a Base58 prefix into byte ranges over the 32-byte key space.
//!
//! Solana addresses are 32 to 44 Base58 characters depending on how many
//! leading zero bytes the key has, and each encoded length maps to its own
//! slice of key space. Compiling the prefix into one `(min, max)` pair per
//! viable length turns the per-candidate test into a memcmp.

use crate::error::Error;

pub const PUBKEY_LEN: usize = 32;

/// The Base58 alphabet used by Solana (and Bitcoin).
pub const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Shortest and longest Base58 encodings of a 32-byte value.
const MIN_ADDRESS_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 44;

/// Inclusive range of public keys, compared as 32-byte big-endian integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubkeyRange {
    pub min: [u8; PUBKEY_LEN],
    pub max: [u8; PUBKEY_LEN],
}

/// A compiled prefix: the original string plus the byte ranges that cover
/// every key whose address starts with it.
#[derive(Debug, Clone)]
pub struct Matcher {
    prefix: String,
    ranges: Vec<PubkeyRange>,
}

impl Matcher {
    /// Compile a Base58 prefix into its range set.
    ///
    /// For each target address length we decode `prefix` padded with '1'
    /// (the zero digit) and with 'z' (the largest digit); the pair spans the
    /// whole tail space at that length. Lengths whose endpoints do not decode
    /// to exactly 32 bytes cannot contain a match and are skipped.
    pub fn compile(prefix: &str) -> Result<Self, Error> {
        // A prefix of only '1' digits names the keys with at least that many
        // leading zero bytes. That set is a single interval no padded
        // endpoint pair can express, so it is built directly.
        if prefix.bytes().all(|b| b == b'1') {
            if prefix.len() > PUBKEY_LEN {
                return Err(Error::InvalidPrefix(prefix.to_owned()));
            }
            let mut max = [0xFF; PUBKEY_LEN];
            max[..prefix.len()].fill(0);
            return Ok(Self {
                prefix: prefix.to_owned(),
                ranges: vec![PubkeyRange {
                    min: [0; PUBKEY_LEN],
                    max,
                }],
            });
        }

        let mut ranges = Vec::new();

        for target_len in MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN {
            if target_len < prefix.len() {
                continue;
            }

            let padding = target_len - prefix.len();
            let min_str = format!("{}{}", prefix, "1".repeat(padding));
            let max_str = format!("{}{}", prefix, "z".repeat(padding));

            if let (Some(min), Some(max)) = (decode_pubkey(&min_str), decode_pubkey(&max_str)) {
                ranges.push(PubkeyRange { min, max });
            }
        }

        if ranges.is_empty() {
            return Err(Error::InvalidPrefix(prefix.to_owned()));
        }

        Ok(Self {
            prefix: prefix.to_owned(),
            ranges,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ranges(&self) -> &[PubkeyRange] {
        &self.ranges
    }

    /// Byte-level membership test. Runs once per derived key on the CPU
    /// path, so it must stay free of allocation and encoding work.
    #[inline]
    pub fn matches(&self, pubkey: &[u8; PUBKEY_LEN]) -> bool {
        self.ranges
            .iter()
            .any(|r| *pubkey >= r.min && *pubkey <= r.max)
    }
}

/// Decode a Base58 string that must represent exactly 32 bytes, counting the
/// leading zero bytes contributed by leading '1' digits.
fn decode_pubkey(s: &str) -> Option<[u8; PUBKEY_LEN]> {
    let decoded = bs58::decode(s).into_vec().ok()?;
    <[u8; PUBKEY_LEN]>::try_from(decoded.as_slice()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_pubkey, pubkey_to_base58};

    #[test]
    fn test_compile_simple_prefix() {
        let matcher = Matcher::compile("So").unwrap();
        assert!(!matcher.ranges().is_empty());
        for range in matcher.ranges() {
            assert!(range.min <= range.max);
        }
    }

    #[test]
    fn test_compile_rejects_non_alphabet_characters() {
        for prefix in ["Ill0O", "0", "O", "l", "I", "hello!"] {
            assert!(matches!(
                Matcher::compile(prefix),
                Err(Error::InvalidPrefix(_))
            ));
        }
    }

    #[test]
    fn test_compile_rejects_prefix_too_large_for_key_space() {
        // 44 'z' digits decode past 2^256 at every length.
        let prefix = "z".repeat(44);
        assert!(matches!(
            Matcher::compile(&prefix),
            Err(Error::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_leading_one_prefix_is_a_zero_byte_interval() {
        let matcher = Matcher::compile("1").unwrap();
        assert_eq!(matcher.ranges().len(), 1);
        let range = matcher.ranges()[0];
        assert_eq!(range.min, [0u8; 32]);
        assert_eq!(range.max[0], 0);
        assert_eq!(range.max[1..], [0xFF; 31]);

        // Any key with a leading zero byte encodes to an address starting '1'.
        let mut key = [0u8; 32];
        key[1] = 0xAB;
        key[31] = 0x01;
        assert!(matcher.matches(&key));
        assert!(pubkey_to_base58(&key).starts_with('1'));

        // And one without does not match.
        let key = [0x7F; 32];
        assert!(!matcher.matches(&key));
    }

    #[test]
    fn test_range_endpoints_encode_with_the_prefix() {
        let matcher = Matcher::compile("AB").unwrap();
        for range in matcher.ranges() {
            assert!(pubkey_to_base58(&range.min).starts_with("AB"));
            assert!(pubkey_to_base58(&range.max).starts_with("AB"));
        }
    }

    /// Every key whose address starts with the prefix must be accepted by
    /// the byte-level test.
    #[test]
    fn test_cover_is_complete_over_sampled_keys() {
        let matcher = Matcher::compile("a").unwrap();

        let mut seed = [0u8; 32];
        for i in 0..2048u32 {
            seed[..4].copy_from_slice(&i.to_le_bytes());
            let pubkey = derive_pubkey(&seed);
            let address = pubkey_to_base58(&pubkey);
            if address.starts_with('a') {
                assert!(
                    matcher.matches(&pubkey),
                    "key {} escaped the range cover",
                    address
                );
            }
        }
    }

    /// For prefixes of a few characters the byte ranges are tight: sampled
    /// keys accepted by the ranges should essentially always pass the
    /// textual check too.
    #[test]
    fn test_spurious_rate_is_small() {
        let matcher = Matcher::compile("ABC").unwrap();

        let mut spurious = 0u32;
        let mut hits = 0u32;
        for range in matcher.ranges() {
            // Walk keys near both range edges, where spurious hits live.
            for delta in 0..64u8 {
                let mut low = range.min;
                low[31] = low[31].wrapping_add(delta);
                let mut high = range.max;
                high[31] = high[31].wrapping_sub(delta);
                for key in [low, high] {
                    if matcher.matches(&key) {
                        hits += 1;
                        if !pubkey_to_base58(&key).starts_with("ABC") {
                            spurious += 1;
                        }
                    }
                }
            }
        }

        assert!(hits > 0);
        assert!(
            spurious as f64 / hits as f64 <= 0.01,
            "{spurious} spurious out of {hits}"
        );
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let matcher = Matcher::compile("").unwrap();
        assert_eq!(matcher.ranges().len(), 1);
        assert!(matcher.matches(&[0u8; 32]));
        assert!(matcher.matches(&[0xFF; 32]));
    }
}
