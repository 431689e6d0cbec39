//! Stack bytecode virtual machine for contract execution.
//!
//! The ledger runs contract bytecode through this module both when a contract
//! is deployed and when one of its functions is invoked.
//!
//! # Architecture
//!
//! - **Stack**: unbounded LIFO of 64-bit signed values
//! - **Memory**: zero-filled, bounds-checked byte buffer sized per call
//! - **Instruction format**: one opcode byte, `PUSH1` followed by one immediate
//! - **Call input**: 4-byte selector followed by head/tail encoded arguments,
//!   built from the contract's ABI
//! - **Budget**: every call is bounded by a step limit
//!
//! # Modules
//!
//! - [`abi`]: ABI parsing, selectors and argument encoding
//! - [`errors`]: Execution and call-construction errors
//! - [`isa`]: Opcode table and disassembler
//! - [`state`]: Typed per-contract storage
//! - [`vm`]: Interpreter and execution context

pub mod abi;
pub mod errors;
pub mod isa;
pub mod state;
pub mod vm;
