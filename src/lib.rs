//! Single-node contract ledger.
//!
//! Provides the stack bytecode virtual machine, the proof-of-work ledger that
//! sequences deploy and invoke transactions into blocks, and the async node
//! boundary with its compiler and persistence collaborators.

pub mod contracts;
pub mod core;
pub mod node;
pub mod storage;
pub mod types;
pub mod utils;
pub mod virtual_machine;
