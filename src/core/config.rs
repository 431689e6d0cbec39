//! Ledger configuration.

use crate::core::errors::LedgerError;
use crate::virtual_machine::vm::ExecutionLimits;

/// Difficulty used when none is configured.
pub const DEFAULT_DIFFICULTY_BITS: u32 = 24;
/// Default transaction pool capacity.
pub const TXPOOL_CAPACITY: usize = 100_000;

/// Settings a ledger is created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Leading zero bits a proof-of-work digest needs; the target is `2^(256 - bits)`.
    pub difficulty_bits: u32,
    /// Bounds applied to every contract call.
    pub limits: ExecutionLimits,
    /// Maximum number of pending transactions.
    pub tx_pool_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty_bits: DEFAULT_DIFFICULTY_BITS,
            limits: ExecutionLimits::default(),
            tx_pool_capacity: TXPOOL_CAPACITY,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.difficulty_bits >= 256 {
            return Err(LedgerError::InvalidDifficulty(self.difficulty_bits));
        }
        if self.limits.step_limit == 0 {
            return Err(LedgerError::InvalidConfig("step limit must be positive".into()));
        }
        if self.tx_pool_capacity == 0 {
            return Err(LedgerError::InvalidConfig("transaction pool capacity must be positive".into()));
        }
        Ok(())
    }
}
