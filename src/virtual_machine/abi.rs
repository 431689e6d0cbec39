//! ABI-driven call construction.
//!
//! Resolves a function by name in a contract's JSON ABI description, derives
//! its canonical signature and 4-byte selector, converts string arguments to
//! typed [`CallArgument`]s and encodes them with the word-aligned head/tail
//! layout after the selector.

use crate::types::hash::Hash;
use crate::virtual_machine::errors::VMError;
use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};

/// Size of an encoded ABI word.
pub const ABI_WORD: usize = 32;
/// Size of a function selector.
pub const SELECTOR_LEN: usize = 4;

/// Parameter of an ABI entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One entry of an ABI description (function, constructor, event, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
}

fn default_entry_kind() -> String {
    "function".to_string()
}

/// Parsed ABI description.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Abi {
    entries: Vec<AbiEntry>,
}

impl Abi {
    /// Parses a JSON ABI.
    ///
    /// Accepts either the entry array itself or a JSON string holding it, which
    /// is how some compiler versions report the ABI.
    pub fn from_json(bytes: &[u8]) -> Result<Abi, VMError> {
        let entries = match serde_json::from_slice::<Vec<AbiEntry>>(bytes) {
            Ok(entries) => entries,
            Err(err) => {
                let inner: String =
                    serde_json::from_slice(bytes).map_err(|_| VMError::InvalidAbi(err.to_string()))?;
                serde_json::from_str(&inner).map_err(|e| VMError::InvalidAbi(e.to_string()))?
            }
        };
        Ok(Abi { entries })
    }

    pub fn entries(&self) -> &[AbiEntry] {
        &self.entries
    }

    /// Finds the first `function` entry called `name`.
    pub fn function(&self, name: &str) -> Result<&AbiEntry, VMError> {
        self.entries
            .iter()
            .find(|e| e.kind == "function" && e.name == name)
            .ok_or_else(|| VMError::FunctionNotFound(name.to_string()))
    }

    /// Builds the full call input (`selector ‖ encoded arguments`) for `name`.
    pub fn encode_call(&self, name: &str, args: &[String]) -> Result<Vec<u8>, VMError> {
        let function = self.function(name)?;
        let typed = decode_arguments(function, args)?;
        encode_call(function, &typed)
    }
}

/// Returns `name(type1,type2,...)` using the declared parameter types.
pub fn canonical_signature(function: &AbiEntry) -> String {
    let types: Vec<&str> = function
        .inputs
        .iter()
        .map(|p| canonical_type(&p.kind))
        .collect();
    format!("{}({})", function.name, types.join(","))
}

fn canonical_type(kind: &str) -> &str {
    match kind {
        "int" => "int256",
        "uint" => "uint256",
        other => other,
    }
}

/// First four bytes of the Keccak-256 digest of the canonical signature.
pub fn selector(function: &AbiEntry) -> [u8; SELECTOR_LEN] {
    let digest = Hash::keccak256(canonical_signature(function).as_bytes());
    let mut out = [0u8; SELECTOR_LEN];
    out.copy_from_slice(&digest.0[..SELECTOR_LEN]);
    out
}

/// Hex form of [`selector`].
pub fn selector_hex(function: &AbiEntry) -> String {
    hex::encode(selector(function))
}

/// Declared parameter type the call builder knows how to convert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Int(usize),
    Uint(usize),
    String,
    Bytes,
    FixedBytes(usize),
}

impl ParamType {
    /// Parses a Solidity type name; anything outside the supported set fails
    /// with [`VMError::UnsupportedArgumentType`].
    pub fn parse(kind: &str) -> Result<ParamType, VMError> {
        let unsupported = || VMError::UnsupportedArgumentType(kind.to_string());
        let bits = |digits: &str| -> Result<usize, VMError> {
            if digits.is_empty() {
                return Ok(256);
            }
            match digits.parse::<usize>() {
                Ok(b) if b > 0 && b <= 256 && b % 8 == 0 && !digits.starts_with('0') => Ok(b),
                _ => Err(unsupported()),
            }
        };

        if kind == "string" {
            Ok(ParamType::String)
        } else if kind == "bytes" {
            Ok(ParamType::Bytes)
        } else if let Some(rest) = kind.strip_prefix("uint") {
            Ok(ParamType::Uint(bits(rest)?))
        } else if let Some(rest) = kind.strip_prefix("int") {
            Ok(ParamType::Int(bits(rest)?))
        } else if let Some(rest) = kind.strip_prefix("bytes") {
            match rest.parse::<usize>() {
                Ok(n) if (1..=32).contains(&n) && !rest.starts_with('0') => Ok(ParamType::FixedBytes(n)),
                _ => Err(unsupported()),
            }
        } else {
            Err(unsupported())
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ParamType::String | ParamType::Bytes)
    }
}

/// Argument converted to its declared ABI type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallArgument {
    Integer(BigInt),
    Text(String),
    Bytes(Vec<u8>),
}

impl CallArgument {
    fn kind(&self) -> &'static str {
        match self {
            CallArgument::Integer(_) => "integer",
            CallArgument::Text(_) => "text",
            CallArgument::Bytes(_) => "bytes",
        }
    }
}

/// Converts one string argument according to its declared type.
pub fn decode_argument(kind: &str, value: &str) -> Result<CallArgument, VMError> {
    let param = ParamType::parse(kind)?;
    let parse_err = |reason: String| VMError::ArgumentParseError {
        param_type: kind.to_string(),
        value: value.to_string(),
        reason,
    };

    match param {
        ParamType::Int(_) | ParamType::Uint(_) => {
            let n = BigInt::parse_bytes(value.trim().as_bytes(), 10)
                .ok_or_else(|| parse_err("not a base-10 integer".to_string()))?;
            if !fits(&param, &n) {
                return Err(parse_err(format!("out of range for {kind}")));
            }
            Ok(CallArgument::Integer(n))
        }
        ParamType::String => Ok(CallArgument::Text(value.to_string())),
        ParamType::Bytes | ParamType::FixedBytes(_) => {
            let digits = value.strip_prefix("0x").unwrap_or(value);
            let bytes = hex::decode(digits).map_err(|e| parse_err(e.to_string()))?;
            if let ParamType::FixedBytes(n) = param {
                if bytes.len() != n {
                    return Err(parse_err(format!("expected {n} bytes, got {}", bytes.len())));
                }
            }
            Ok(CallArgument::Bytes(bytes))
        }
    }
}

/// Converts `args` positionally against the function's declared inputs.
pub fn decode_arguments(function: &AbiEntry, args: &[String]) -> Result<Vec<CallArgument>, VMError> {
    if function.inputs.len() != args.len() {
        return Err(VMError::ArgumentCountMismatch {
            function: function.name.clone(),
            expected: function.inputs.len(),
            actual: args.len(),
        });
    }
    function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, value)| decode_argument(&param.kind, value))
        .collect()
}

/// Encodes `selector ‖ head ‖ tail` for already typed arguments.
pub fn encode_call(function: &AbiEntry, args: &[CallArgument]) -> Result<Vec<u8>, VMError> {
    if function.inputs.len() != args.len() {
        return Err(VMError::ArgumentCountMismatch {
            function: function.name.clone(),
            expected: function.inputs.len(),
            actual: args.len(),
        });
    }
    let params = function
        .inputs
        .iter()
        .map(|p| ParamType::parse(&p.kind))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = selector(function).to_vec();
    out.extend(encode_arguments(&params, args)?);
    Ok(out)
}

/// Head/tail encoding of a parameter list, without selector.
pub fn encode_arguments(params: &[ParamType], args: &[CallArgument]) -> Result<Vec<u8>, VMError> {
    let mut head = Vec::with_capacity(params.len() * ABI_WORD);
    let mut tail = Vec::new();
    let head_len = params.len() * ABI_WORD;

    for (param, arg) in params.iter().zip(args) {
        let mismatch = || VMError::ArgumentTypeMismatch {
            expected: format!("{param:?}"),
            actual: arg.kind(),
        };
        match (param, arg) {
            (ParamType::Int(_) | ParamType::Uint(_), CallArgument::Integer(n)) => {
                if !fits(param, n) {
                    return Err(mismatch());
                }
                head.extend(int_word(n));
            }
            (ParamType::FixedBytes(size), CallArgument::Bytes(b)) if b.len() == *size => {
                head.extend(pad_right(b));
            }
            (ParamType::String, CallArgument::Text(s)) => {
                head.extend(usize_word(head_len + tail.len()));
                tail.extend(usize_word(s.len()));
                tail.extend(pad_right(s.as_bytes()));
            }
            (ParamType::Bytes, CallArgument::Bytes(b)) => {
                head.extend(usize_word(head_len + tail.len()));
                tail.extend(usize_word(b.len()));
                tail.extend(pad_right(b));
            }
            _ => return Err(mismatch()),
        }
    }

    head.extend(tail);
    Ok(head)
}

fn fits(param: &ParamType, n: &BigInt) -> bool {
    match *param {
        ParamType::Uint(bits) => n.sign() != Sign::Minus && n.bits() <= bits as u64,
        ParamType::Int(bits) => {
            let bound = BigInt::from(1) << (bits - 1);
            *n >= -bound.clone() && *n < bound
        }
        _ => false,
    }
}

/// Two's complement big-endian word, sign-extended to 32 bytes.
fn int_word(n: &BigInt) -> [u8; ABI_WORD] {
    let fill = if n.sign() == Sign::Minus { 0xff } else { 0x00 };
    let mut word = [fill; ABI_WORD];
    let bytes = n.to_signed_bytes_be();
    // uint256 values above i256::MAX carry an extra leading zero byte
    let bytes = if bytes.len() > ABI_WORD { &bytes[bytes.len() - ABI_WORD..] } else { &bytes[..] };
    word[ABI_WORD - bytes.len()..].copy_from_slice(bytes);
    word
}

fn usize_word(n: usize) -> [u8; ABI_WORD] {
    let mut word = [0u8; ABI_WORD];
    word[ABI_WORD - 8..].copy_from_slice(&(n as u64).to_be_bytes());
    word
}

/// Copies `data` and zero-pads it to a multiple of the word size.
fn pad_right(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % ABI_WORD;
    if rem != 0 {
        out.resize(out.len() + (ABI_WORD - rem), 0);
    }
    out
}
