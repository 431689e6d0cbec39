//! Compiler seam.
//!
//! The ledger never compiles source itself. A [`Compiler`] turns contract
//! source into an ABI description and a bytecode hex string; everything after
//! that (metadata stripping, hex normalization) happens here so every compiler
//! backend gets the same treatment.

use crate::types::wrapper_types::BoxFuture;
use ledger_derive::Error;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Start of the CBOR metadata trailer solc appends to runtime bytecode.
pub const METADATA_MARKER: &str = "a165627a7a72305820";
/// Source unit name used when handing source to solc.
const SOURCE_UNIT: &str = "contract.sol";

/// Failures of the compile step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The compiler reported an error for the source.
    #[error("compiler rejected source: {0}")]
    Rejected(String),
    /// The compiler answered with something that is not the expected JSON.
    #[error("malformed compiler output: {0}")]
    MalformedOutput(String),
    /// No contract with the requested name, or no contract at all.
    #[error("contract {0} not found in compiler output")]
    ContractMissing(String),
    /// Bytecode hex did not decode.
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),
    /// The compiler could not be reached or started.
    #[error("compiler unavailable: {0}")]
    Unavailable(String),
}

/// Output of a successful compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledContract {
    pub name: String,
    /// ABI description as JSON text.
    pub abi: String,
    /// Bytecode hex exactly as reported by the compiler.
    pub bytecode: String,
}

impl CompiledContract {
    /// Decoded bytecode with the metadata trailer removed.
    pub fn code(&self) -> Result<Vec<u8>, CompileError> {
        normalize_bytecode(strip_metadata(&self.bytecode))
    }
}

/// Turns contract source into ABI and bytecode.
pub trait Compiler: Send + Sync {
    /// Compiles `source`, selecting the contract called `contract` or the
    /// first one reported when `None`.
    fn compile<'a>(
        &'a self,
        source: &'a str,
        contract: Option<&'a str>,
    ) -> BoxFuture<'a, Result<CompiledContract, CompileError>>;
}

/// Cuts the bytecode hex at the last byte-aligned metadata marker, if present.
pub fn strip_metadata(bytecode: &str) -> &str {
    match bytecode
        .rmatch_indices(METADATA_MARKER)
        .find(|(index, _)| index % 2 == 0)
    {
        Some((index, _)) => &bytecode[..index],
        None => bytecode,
    }
}

/// Drops every non-hex character, left-pads to an even length and decodes.
pub fn normalize_bytecode(bytecode: &str) -> Result<Vec<u8>, CompileError> {
    let mut cleaned: String = bytecode.chars().filter(char::is_ascii_hexdigit).collect();
    if cleaned.len() % 2 != 0 {
        cleaned.insert(0, '0');
    }
    hex::decode(&cleaned).map_err(|e| CompileError::InvalidBytecode(e.to_string()))
}

/// Reads a compiler response.
///
/// The response is either `{"error": "..."}` or a map from contract name to
/// `{"abi": ..., "evm": {"bytecode": {"object": "..."}}}`. The ABI may be given
/// as JSON or as a string holding JSON.
pub fn parse_compiler_output(output: &str, contract: Option<&str>) -> Result<CompiledContract, CompileError> {
    let value: Value =
        serde_json::from_str(output).map_err(|e| CompileError::MalformedOutput(e.to_string()))?;
    let map = value
        .as_object()
        .ok_or_else(|| CompileError::MalformedOutput("expected a JSON object".into()))?;
    if let Some(error) = map.get("error") {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return Err(CompileError::Rejected(message));
    }
    select_contract(map, contract)
}

fn select_contract(contracts: &Map<String, Value>, contract: Option<&str>) -> Result<CompiledContract, CompileError> {
    let (name, entry) = match contract {
        Some(name) => contracts
            .get_key_value(name)
            .ok_or_else(|| CompileError::ContractMissing(name.to_string()))?,
        None => contracts
            .iter()
            .next()
            .ok_or_else(|| CompileError::ContractMissing("<any>".to_string()))?,
    };

    let abi = match entry.get("abi") {
        Some(Value::String(text)) => text.clone(),
        Some(value @ Value::Array(_)) => value.to_string(),
        _ => return Err(CompileError::MalformedOutput(format!("{name}: missing abi"))),
    };
    let bytecode = entry
        .pointer("/evm/bytecode/object")
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| CompileError::MalformedOutput(format!("{name}: missing evm.bytecode.object")))?;

    Ok(CompiledContract {
        name: name.clone(),
        abi,
        bytecode: bytecode.to_string(),
    })
}

/// Builds the standard-JSON request solc expects.
pub fn standard_json_input(source: &str) -> Value {
    json!({
        "language": "Solidity",
        "sources": { SOURCE_UNIT: { "content": source } },
        "settings": {
            "outputSelection": { "*": { "*": ["abi", "evm.bytecode.object"] } }
        }
    })
}

/// Reads a solc standard-JSON response into the same shape as
/// [`parse_compiler_output`].
pub fn parse_standard_json_output(output: &str, contract: Option<&str>) -> Result<CompiledContract, CompileError> {
    let value: Value =
        serde_json::from_str(output).map_err(|e| CompileError::MalformedOutput(e.to_string()))?;

    let first_error = value
        .get("errors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|e| e.get("severity").and_then(Value::as_str) == Some("error"));
    if let Some(error) = first_error {
        let message = error
            .get("formattedMessage")
            .or_else(|| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown compiler error");
        return Err(CompileError::Rejected(message.to_string()));
    }

    let contracts = value
        .pointer(&format!("/contracts/{SOURCE_UNIT}"))
        .and_then(Value::as_object)
        .ok_or_else(|| CompileError::MalformedOutput("no contracts in output".into()))?;
    select_contract(contracts, contract)
}

/// Compiler backed by a local `solc` binary in standard-JSON mode.
#[derive(Clone, Debug)]
pub struct SolcCompiler {
    program: PathBuf,
}

impl SolcCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, source: &str, contract: Option<&str>) -> Result<CompiledContract, CompileError> {
        let unavailable = |e: std::io::Error| CompileError::Unavailable(format!("{}: {e}", self.program.display()));
        let mut child = Command::new(&self.program)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(unavailable)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CompileError::Unavailable("failed to open compiler stdin".into()))?;
        stdin
            .write_all(standard_json_input(source).to_string().as_bytes())
            .await
            .map_err(unavailable)?;
        drop(stdin);

        let output = child.wait_with_output().await.map_err(unavailable)?;
        if !output.status.success() {
            return Err(CompileError::Unavailable(format!(
                "solc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_standard_json_output(&String::from_utf8_lossy(&output.stdout), contract)
    }
}

impl Default for SolcCompiler {
    fn default() -> Self {
        Self::new("solc")
    }
}

impl Compiler for SolcCompiler {
    fn compile<'a>(
        &'a self,
        source: &'a str,
        contract: Option<&'a str>,
    ) -> BoxFuture<'a, Result<CompiledContract, CompileError>> {
        Box::pin(self.run(source, contract))
    }
}
