//! Content addressing: SHA-256 block hashes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, Result};

/// The literal written in place of a hash list to mark a deleted file.
///
/// A single character is never a 64-character hex digest, so it cannot
/// collide with a real [`BlockHash`].
pub const TOMBSTONE_HASH: &str = "0";

/// Length of a hex-encoded SHA-256 digest.
const HEX_LEN: usize = 64;

/// The content address of a block: lowercase hex SHA-256 of its bytes.
///
/// Identical bytes always produce the same hash. The only way to obtain a
/// `BlockHash` is to digest bytes or to parse a well-formed 64-character
/// hex string, so the tombstone marker can never be represented here.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockHash(String);

impl BlockHash {
    /// Hash the given bytes.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hex::encode(hasher.finalize()))
    }

    /// Parse a hex digest, normalising to lowercase.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidBlockHash(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that `data` hashes to `self`.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        let actual = Self::digest(data);
        if &actual != self {
            return Err(CoreError::HashMismatch {
                expected: self.0.clone(),
                actual: actual.0,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", &self.0[..16])
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlockHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BlockHash {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

impl From<BlockHash> for String {
    fn from(hash: BlockHash) -> Self {
        hash.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_digest() {
        // sha256("abcd")
        assert_eq!(
            BlockHash::digest(b"abcd").as_str(),
            "88d4266fd4e6338d13b845fcf289579d209c897823b9217da3e161936f031589"
        );
    }

    #[test]
    fn test_empty_digest() {
        assert_eq!(
            BlockHash::digest(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_tombstone_marker_is_not_a_hash() {
        assert!(BlockHash::from_hex(TOMBSTONE_HASH).is_err());
    }

    #[test]
    fn test_from_hex_normalises_case() {
        let lower = BlockHash::digest(b"efgh");
        let upper = BlockHash::from_hex(&lower.as_str().to_ascii_uppercase()).unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(BlockHash::from_hex("").is_err());
        assert!(BlockHash::from_hex(&"g".repeat(64)).is_err());
        assert!(BlockHash::from_hex(&"a".repeat(63)).is_err());
    }

    #[test]
    fn test_verify() {
        let hash = BlockHash::digest(b"payload");
        assert!(hash.verify(b"payload").is_ok());
        assert!(matches!(
            hash.verify(b"tampered"),
            Err(CoreError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_serde_rejects_tombstone() {
        let result: std::result::Result<BlockHash, _> = serde_json::from_str("\"0\"");
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn test_digest_deterministic(data in prop::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(BlockHash::digest(&data), BlockHash::digest(&data));
        }

        #[test]
        fn test_digest_distinguishes_content(
            a in prop::collection::vec(any::<u8>(), 0..256),
            b in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(BlockHash::digest(&a), BlockHash::digest(&b));
        }
    }
}
