//! 32-byte digests: SHA3-256 for ledger hashing, Keccak-256 for ABI selectors.

use num_bigint::BigUint;
use serde::{Serialize, Serializer};
use sha3::{Digest, Keccak256, Sha3_256};
use std::fmt;

/// Digest length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size 32-byte digest.
///
/// `Copy` so it can be passed around by value during mining and block building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Ord, PartialOrd)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// All-zero hash.
    pub const fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates an incremental SHA3-256 builder.
    pub fn sha3() -> HashBuilder {
        HashBuilder::new()
    }

    /// Keccak-256 (pre-standard SHA3 padding) of `data`.
    pub fn keccak256(data: &[u8]) -> Hash {
        Hash(Keccak256::digest(data).into())
    }

    /// Interprets the digest as an unsigned big-endian integer.
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Incremental SHA3-256 hash builder.
pub struct HashBuilder {
    hasher: Sha3_256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha3_256::new(),
        }
    }

    /// Feeds data into the hash computation.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Builder-style variant of [`update`](Self::update).
    pub fn chain(mut self, data: &[u8]) -> Self {
        self.hasher.update(data);
        self
    }

    /// Consumes the builder and returns the final hash.
    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}
