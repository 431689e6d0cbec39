//! Ledger transactions.

use serde::{Deserialize, Serialize};

/// What applying a transaction does to ledger state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TransactionKind {
    /// Carries bytecode: creates a contract.
    Deploy,
    /// Names a function on the recipient contract.
    Invoke,
    /// Neither: recorded in the block, no state transition.
    Transfer,
}

/// An immutable request to change ledger state.
///
/// The kind is derived from the contents: non-empty bytecode makes a
/// deployment, otherwise a non-empty function signature makes an invocation,
/// otherwise the transaction is a plain transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    /// Contract address for invocations, free-form otherwise.
    pub recipient: String,
    /// Opaque application data, never interpreted by the ledger.
    #[serde(default)]
    pub payload: String,
    /// Deployment bytecode.
    #[serde(default, with = "hex::serde")]
    pub bytecode: Vec<u8>,
    /// Function name to invoke on the recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_signature: Option<String>,
    /// JSON ABI description stored with a deployed contract.
    #[serde(default, with = "hex::serde")]
    pub abi: Vec<u8>,
    /// String arguments decoded against the ABI at execution time.
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl Transaction {
    /// A transfer with an opaque payload.
    pub fn transfer(sender: impl Into<String>, recipient: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            payload: payload.into(),
            bytecode: Vec::new(),
            function_signature: None,
            abi: Vec::new(),
            arguments: Vec::new(),
        }
    }

    /// A contract deployment.
    pub fn deploy(sender: impl Into<String>, bytecode: Vec<u8>, abi: Vec<u8>) -> Self {
        Self {
            bytecode,
            abi,
            ..Self::transfer(sender, String::new(), String::new())
        }
    }

    /// An invocation of `function` on the contract at `recipient`.
    pub fn invoke(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        function: impl Into<String>,
        arguments: Vec<String>,
    ) -> Self {
        Self {
            function_signature: Some(function.into()),
            arguments,
            ..Self::transfer(sender, recipient, String::new())
        }
    }

    pub fn kind(&self) -> TransactionKind {
        if !self.bytecode.is_empty() {
            TransactionKind::Deploy
        } else if self.function_signature.as_deref().is_some_and(|s| !s.is_empty()) {
            TransactionKind::Invoke
        } else {
            TransactionKind::Transfer
        }
    }
}
