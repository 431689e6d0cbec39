//! Persistence seam for contract records.

use crate::contracts::record::ContractRecord;
use crate::types::address::Address;
use ledger_derive::Error;

/// Errors that can occur while interacting with storage backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not complete the operation.
    #[error("persistence error: {0}")]
    Persistence(String),
    /// A stored record could not be read back.
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Keyed store of [`ContractRecord`]s.
///
/// Implementations must be thread-safe (`Send + Sync`) so the node can share
/// one store between tasks. A single `persist` or `retrieve` is the only
/// durability unit; nothing is transactional across calls.
pub trait ContractStore: Send + Sync {
    /// Inserts or replaces the record stored under its address.
    fn persist(&self, record: &ContractRecord) -> Result<(), StorageError>;

    /// Returns the record stored under `address`, if any.
    fn retrieve(&self, address: &Address) -> Result<Option<ContractRecord>, StorageError>;

    /// Returns every stored record, ordered by address.
    fn retrieve_all(&self) -> Result<Vec<ContractRecord>, StorageError>;

    /// Removes and returns the record stored under `address`.
    fn remove(&self, address: &Address) -> Result<Option<ContractRecord>, StorageError>;
}
