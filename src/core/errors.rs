use crate::contracts::compiler::CompileError;
use crate::storage::storage_trait::StorageError;
use crate::types::address::Address;
use crate::virtual_machine::errors::VMError;
use ledger_derive::Error;

/// Failures surfaced by the ledger and the node boundary.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No contract is stored at the address (or the address does not parse).
    #[error("contract not found at address: {0}")]
    ContractNotFound(String),
    /// The contract call failed inside the interpreter or while building input.
    #[error("execution failed: {0}")]
    Execution(#[from] VMError),
    /// A deployment derived an address that already holds a contract.
    #[error("address already holds a contract: {0}")]
    AddressOccupied(Address),
    /// Difficulty outside `0..=255` bits.
    #[error("invalid difficulty: {0} bits (must be below 256)")]
    InvalidDifficulty(u32),
    /// Configuration value rejected at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A mined proof no longer extends the chain tip or does not meet the target.
    #[error("stale proof: mined against {mined_on}, chain expects {expected}")]
    StaleProof { mined_on: String, expected: String },
    /// Linkage or proof check failed while validating the chain.
    #[error("invalid block {index}: {reason}")]
    InvalidBlock { index: u64, reason: String },
    /// A transaction sealed into a block did not take effect.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    /// Proof-of-work search was cancelled before a nonce was found.
    #[error("mining cancelled")]
    MiningCancelled,
    /// The pending pool is at capacity.
    #[error("transaction pool is full ({0} pending)")]
    PoolFull(usize),
    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),
    #[error("{0}")]
    Persistence(#[from] StorageError),
    /// The node is shutting down or a background task died.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
