//! Per-transaction outcomes of a sealed block.
//!
//! Sealing never fails because of a single transaction, so the outcome of
//! every transaction is kept here: callers learn deployment addresses and
//! failure reasons from receipts.

use crate::types::address::Address;
use serde::Serialize;

/// What applying one transaction did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// Contract created at the address.
    Deployed(Address),
    /// Function call on the contract at the address succeeded.
    Invoked(Address),
    /// Transfer recorded without a state transition.
    Recorded,
    /// Transition failed; ledger state was left untouched.
    Failed(String),
}

/// Record of a single transaction's outcome within a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub block_index: u64,
    /// Position of the transaction inside the block.
    pub position: usize,
    pub outcome: Outcome,
}

impl Receipt {
    /// Address of the contract created by this transaction, if any.
    pub fn deployed_address(&self) -> Option<Address> {
        match self.outcome {
            Outcome::Deployed(address) => Some(address),
            _ => None,
        }
    }
}
