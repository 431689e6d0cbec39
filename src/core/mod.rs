//! Core ledger data structures.
//!
//! This module contains the building blocks of the ledger:
//! - `Block`: Immutable, hash-linked container of transactions
//! - `Transaction`: Deployment, invocation or plain transfer request
//! - `ProofOfWork`: Nonce search gating every sealed block
//! - `Blockchain`: Chain, contract storage and state transitions
//! - `Receipt`: Outcome of each sealed transaction

pub mod block;
pub mod blockchain;
pub mod config;
pub mod errors;
pub mod proof;
pub mod receipt;
pub mod transaction;
