//! Proof-of-work search.
//!
//! A nonce is valid for a previous-hash when the SHA3-256 digest of
//! `nonce ‖ previous_hash` (nonce in decimal) read as a big-endian integer is
//! strictly below `2^(256 - difficulty_bits)`. The search walks nonces from 0
//! upward, so it is deterministic in its inputs.

use crate::core::errors::LedgerError;
use crate::debug;
use crate::types::hash::Hash;
use num_bigint::BigUint;
use std::sync::atomic::{AtomicBool, Ordering};

/// Nonces tried between two checks of the cancellation flag.
const CANCEL_CHECK_INTERVAL: u64 = 1 << 12;
/// Nonces tried between two progress log lines.
const PROGRESS_LOG_INTERVAL: u64 = 1 << 22;

/// Difficulty target and search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty_bits: u32,
    target: BigUint,
}

impl ProofOfWork {
    pub fn new(difficulty_bits: u32) -> Result<Self, LedgerError> {
        if difficulty_bits >= 256 {
            return Err(LedgerError::InvalidDifficulty(difficulty_bits));
        }
        Ok(Self {
            difficulty_bits,
            target: BigUint::from(1u8) << (256 - difficulty_bits),
        })
    }

    pub fn difficulty_bits(&self) -> u32 {
        self.difficulty_bits
    }

    pub fn target(&self) -> &BigUint {
        &self.target
    }

    /// Digest of a candidate nonce against `previous_hash`.
    pub fn digest(nonce: u64, previous_hash: &str) -> Hash {
        Hash::sha3()
            .chain(nonce.to_string().as_bytes())
            .chain(previous_hash.as_bytes())
            .finalize()
    }

    pub fn is_valid(&self, previous_hash: &str, nonce: u64) -> bool {
        Self::digest(nonce, previous_hash).to_biguint() < self.target
    }

    /// Returns the first valid nonce.
    pub fn mine(&self, previous_hash: &str) -> Result<u64, LedgerError> {
        self.mine_with_cancel(previous_hash, &AtomicBool::new(false))
    }

    /// Returns the first valid nonce, or [`LedgerError::MiningCancelled`] once
    /// `cancel` is observed set.
    pub fn mine_with_cancel(&self, previous_hash: &str, cancel: &AtomicBool) -> Result<u64, LedgerError> {
        let mut nonce = 0u64;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return Err(LedgerError::MiningCancelled);
            }
            if self.is_valid(previous_hash, nonce) {
                return Ok(nonce);
            }
            if nonce > 0 && nonce % PROGRESS_LOG_INTERVAL == 0 {
                debug!("mining: tried {nonce} nonces against {previous_hash}");
            }
            nonce = nonce
                .checked_add(1)
                .ok_or_else(|| LedgerError::Unavailable("nonce space exhausted".into()))?;
        }
    }
}
