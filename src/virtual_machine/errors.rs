use ledger_derive::Error;

/// Errors raised while building call input or executing bytecode.
///
/// Every variant aborts only the call in flight; the ledger decides what to do
/// with the enclosing transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    /// Pop, peek or dup needed more values than the stack holds.
    #[error("stack underflow: needed {required} values, stack holds {available}")]
    StackUnderflow { required: usize, available: usize },
    /// Memory, call input or bytecode access outside `[0, len)`.
    #[error("{region} access out of bounds: offset {offset}, size {size}, length {len}")]
    OutOfBounds {
        region: &'static str,
        offset: i64,
        size: i64,
        len: usize,
    },
    /// Byte that does not decode to any opcode.
    #[error("unknown opcode: 0x{0:02x}")]
    UnknownOpcode(u8),
    /// Program counter ran past the end of the code without executing STOP.
    #[error("execution reached end of bytecode without STOP")]
    UnterminatedExecution,
    /// The per-call step limit was hit.
    #[error("execution budget of {limit} steps exceeded")]
    ExecutionBudgetExceeded { limit: u64 },
    /// ABI description is not valid JSON of the expected shape.
    #[error("invalid ABI: {0}")]
    InvalidAbi(String),
    /// No `function` entry with that name exists in the ABI.
    #[error("function not found in ABI: {0}")]
    FunctionNotFound(String),
    /// Caller supplied a different number of arguments than the function declares.
    #[error("function {function} takes {expected} arguments, got {actual}")]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },
    /// An argument could not be converted to its declared type.
    #[error("cannot convert argument {value:?} to {param_type}: {reason}")]
    ArgumentParseError {
        param_type: String,
        value: String,
        reason: String,
    },
    /// Declared parameter type has no string conversion.
    #[error("unsupported argument type: {0}")]
    UnsupportedArgumentType(String),
    /// A typed argument does not match the declared parameter type.
    #[error("argument of kind {actual} cannot be encoded as {expected}")]
    ArgumentTypeMismatch {
        expected: String,
        actual: &'static str,
    },
}
