//! Contract source handling outside the ledger core.
//!
//! - [`compiler`]: Compiler seam, compiler output parsing and bytecode cleanup
//! - [`record`]: Persisted contract records

pub mod compiler;
pub mod record;
