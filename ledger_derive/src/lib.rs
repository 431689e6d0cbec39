//! Derive macros for the contract ledger crate.
//!
//! Provides `#[derive(Error)]`, which generates `Display` and `std::error::Error`
//! for error enums and structs without pulling in `thiserror`.

mod error;

use proc_macro::TokenStream;

/// Implements `Display`, `Error` and any `#[from]` conversions for an error type.
#[proc_macro_derive(Error, attributes(error, from))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
