//! Core type definitions shared by the VM and the ledger.
//!
//! - `Hash`: 32-byte SHA3-256 / Keccak-256 digests
//! - `Address`: 20-byte contract addresses
//! - `BoxFuture`: object-safe async return type for collaborator traits

pub mod address;
pub mod hash;
pub mod wrapper_types;
