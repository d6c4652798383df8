use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Digits used by derived short identifiers: `1-9`, `a-z`, `A-Z`.
///
/// `0` is left out so that an identifier never starts with a character that
/// reads like padding.
pub const SHORT_ID_ALPHABET: &[u8; 61] =
    b"123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of every derived short identifier.
pub const SHORT_ID_LEN: usize = 8;

const BASE: u32 = 61;

/// Stable per-client namespace for archived artifacts.
///
/// Derived from the client's self-reported seed, so the same seed always maps
/// to the same identifier without a lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ShortId(String);

impl ShortId {
    /// Derive the identifier for `seed`.
    ///
    /// The SHA-256 digest of the seed is read as a big-endian integer and
    /// re-encoded in base 61. The eight most significant digits are kept;
    /// shorter encodings are left-padded with the zero digit (`1`).
    #[must_use]
    pub fn derive(seed: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
        Self(encode_base61(digest))
    }

    /// Parse an identifier previously produced by [`ShortId::derive`].
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidShortId`] if `value` is not exactly
    /// [`SHORT_ID_LEN`] characters from [`SHORT_ID_ALPHABET`].
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        if value.len() != SHORT_ID_LEN {
            return Err(CoreError::InvalidShortId {
                value: value.to_owned(),
                reason: "wrong length",
            });
        }
        if !value.bytes().all(|b| SHORT_ID_ALPHABET.contains(&b)) {
            return Err(CoreError::InvalidShortId {
                value: value.to_owned(),
                reason: "character outside the id alphabet",
            });
        }
        Ok(Self(value.to_owned()))
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Re-encode a 256-bit big-endian value as a fixed-width base-61 string.
fn encode_base61(mut value: [u8; 32]) -> String {
    let mut digits: Vec<u8> = Vec::with_capacity(44);
    while value.iter().any(|&b| b != 0) {
        let mut rem: u32 = 0;
        for byte in &mut value {
            let acc = (rem << 8) | u32::from(*byte);
            // rem < 61, so acc / 61 < 256.
            #[allow(clippy::cast_possible_truncation)]
            {
                *byte = (acc / BASE) as u8;
            }
            rem = acc % BASE;
        }
        digits.push(SHORT_ID_ALPHABET[rem as usize]);
    }
    while digits.len() < SHORT_ID_LEN {
        digits.push(SHORT_ID_ALPHABET[0]);
    }
    digits.reverse();
    digits.truncate(SHORT_ID_LEN);
    digits.into_iter().map(char::from).collect()
}

/// Salted SHA-256 of a caller's network address.
///
/// Lets artifacts from the same caller be correlated without storing the
/// address itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct CallerHash(pub [u8; 32]);

impl CallerHash {
    /// Hash `address` under `salt`: `SHA-256(salt || address)`.
    #[must_use]
    pub fn compute(salt: &[u8], address: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(address.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CallerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_zero_is_all_padding() {
        assert_eq!(encode_base61([0u8; 32]), "11111111");
    }

    #[test]
    fn encode_small_values_are_left_padded() {
        let mut sixty = [0u8; 32];
        sixty[31] = 60;
        assert_eq!(encode_base61(sixty), "1111111Z");

        let mut sixty_one = [0u8; 32];
        sixty_one[31] = 61;
        assert_eq!(encode_base61(sixty_one), "11111121");
    }

    #[test]
    fn encode_keeps_most_significant_digits() {
        // 61^8 encodes as "2" followed by eight zero digits; truncation keeps
        // the leading eight.
        let mut value = [0u8; 32];
        let big: u64 = 61u64.pow(8);
        value[24..].copy_from_slice(&big.to_be_bytes());
        assert_eq!(encode_base61(value), "21111111");
    }

    #[test]
    fn derive_distinct_seeds_give_distinct_ids() {
        let a = ShortId::derive("alice");
        let b = ShortId::derive("bob");
        assert_ne!(a, b);
    }

    #[test]
    fn derive_empty_seed_is_valid() {
        let id = ShortId::derive("");
        assert!(ShortId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn parse_rejects_wrong_length_and_alphabet() {
        assert!(ShortId::parse("abc").is_err());
        assert!(ShortId::parse("abcdefg0").is_err(), "'0' is outside the alphabet");
        assert!(ShortId::parse("abcd-fgh").is_err());
        assert!(ShortId::parse("abcdEFGH").is_ok());
    }

    #[test]
    fn caller_hash_depends_on_salt() {
        let plain = CallerHash::compute(b"", "127.0.0.1");
        let salted = CallerHash::compute(b"pepper", "127.0.0.1");
        assert_ne!(plain, salted);
        assert_eq!(plain.to_string().len(), 64);
    }

    proptest! {
        #[test]
        fn derive_is_deterministic_and_well_formed(seed in ".*") {
            let first = ShortId::derive(&seed);
            let second = ShortId::derive(&seed);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.as_str().len(), SHORT_ID_LEN);
            prop_assert!(first.as_str().bytes().all(|b| SHORT_ID_ALPHABET.contains(&b)));
        }
    }
}
