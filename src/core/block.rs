//! Sealed blocks.

use crate::core::transaction::Transaction;
use crate::types::hash::Hash;
use serde::{Deserialize, Serialize};

/// Previous-hash carried by the first block of every chain.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Immutable block of the chain.
///
/// Blocks are linked by `previous_hash`, which holds the [`hash`](Block::hash)
/// of the preceding block (or [`GENESIS_PREVIOUS_HASH`] for index 1).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, starting at 1.
    pub index: u64,
    /// Unix time in seconds at which the block was sealed.
    pub timestamp: u64,
    /// Transactions in pool order.
    pub transactions: Vec<Transaction>,
    /// Proof-of-work nonce.
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    /// Hex SHA3-256 digest of `previous_hash ‖ proof ‖ timestamp`, numbers in decimal.
    pub fn hash(&self) -> String {
        Hash::sha3()
            .chain(self.previous_hash.as_bytes())
            .chain(self.proof.to_string().as_bytes())
            .chain(self.timestamp.to_string().as_bytes())
            .finalize()
            .to_hex()
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1
    }
}
