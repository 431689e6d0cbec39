//! Stack bytecode interpreter.
//!
//! The VM runs a fixed bytecode buffer against a call-input buffer, using a
//! [`Stack`] of 64-bit signed values and a zero-filled linear [`Memory`].
//!
//! # Word width
//!
//! `MLOAD`, `MSTORE` and `CALLDATALOAD` address 32-byte windows while stack
//! values are 64 bits wide. The VM keeps the narrow layout bit-for-bit:
//!
//! - `MLOAD`/`CALLDATALOAD` read the whole 32-byte window and push its
//!   low-order 64 bits (the last 8 bytes, big-endian).
//! - `MSTORE` checks the whole 32-byte window and writes the value's 8
//!   big-endian bytes at the *start* of it; the remaining 24 bytes are left
//!   as they were.
//!
//! As a consequence `MSTORE x` followed by `MLOAD` at the same offset does not
//! read `x` back; `MLOAD` at `offset - 24` does.
//!
//! # Failure model
//!
//! Every instruction validates its operands and ranges before popping or
//! writing anything, so a failing instruction leaves the stack and memory
//! exactly as they were before it started.

mod context;
mod memory;
mod stack;
#[cfg(test)]
mod tests;

pub use context::{CallOutcome, ExecContext};
pub use memory::{Memory, WORD_SIZE, checked_range};
pub use stack::{Stack, Word};

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Opcode;
use std::ops::ControlFlow;

/// Default number of instructions a single call may execute.
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;
/// Default size in bytes of the memory given to each call.
pub const DEFAULT_MEMORY_SIZE: usize = 4096;

/// Per-call resource bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum instructions executed before [`VMError::ExecutionBudgetExceeded`].
    pub step_limit: u64,
    /// Bytes of zeroed memory allocated when the call starts.
    pub memory_size: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
            memory_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

/// Bytecode virtual machine.
///
/// Executes bytecode from the instruction pointer until `STOP`, an error, or
/// the end of the buffer (which is an error of its own).
#[derive(Debug)]
pub struct VM {
    code: Box<[u8]>,
    input: Box<[u8]>,
    ip: usize,
    stack: Stack,
    memory: Memory,
    steps: u64,
    limits: ExecutionLimits,
}

impl VM {
    /// Creates a VM over `code` with the given call input.
    pub fn new(code: impl Into<Box<[u8]>>, input: impl Into<Box<[u8]>>, limits: ExecutionLimits) -> Self {
        Self {
            code: code.into(),
            input: input.into(),
            ip: 0,
            stack: Stack::new(),
            memory: Memory::new(limits.memory_size),
            steps: 0,
            limits,
        }
    }

    /// Runs until `STOP` or failure.
    ///
    /// A successful run never produces data: the instruction set has no way to
    /// return a value.
    pub fn run(&mut self) -> Result<(), VMError> {
        loop {
            if self.ip >= self.code.len() {
                return Err(VMError::UnterminatedExecution);
            }
            if self.steps >= self.limits.step_limit {
                return Err(VMError::ExecutionBudgetExceeded {
                    limit: self.limits.step_limit,
                });
            }
            self.steps += 1;

            let byte = self.code[self.ip];
            let opcode = Opcode::try_from(byte)?;
            self.ip += 1;
            if let ControlFlow::Break(()) = self.exec(opcode)? {
                return Ok(());
            }
        }
    }

    /// Executes one instruction; `Break` means the call halted.
    fn exec(&mut self, opcode: Opcode) -> Result<ControlFlow<()>, VMError> {
        match opcode {
            Opcode::Stop => return Ok(ControlFlow::Break(())),
            Opcode::Add => self.binary(i64::wrapping_add)?,
            Opcode::Mul => self.binary(i64::wrapping_mul)?,
            Opcode::CallDataLoad => {
                let offset = self.stack.peek(0)?;
                let range = checked_range("calldata", offset, WORD_SIZE as i64, self.input.len())?;
                let value = low_word(&self.input[range]);
                self.stack.pop()?;
                self.stack.push(value);
            }
            Opcode::CallDataSize => self.stack.push(self.input.len() as i64),
            Opcode::CallDataCopy => {
                let mem_offset = self.stack.peek(0)?;
                let input_offset = self.stack.peek(1)?;
                let length = self.stack.peek(2)?;
                let dst = self.memory.check(mem_offset, length)?;
                let src = checked_range("calldata", input_offset, length, self.input.len())?;
                for _ in 0..3 {
                    self.stack.pop()?;
                }
                let data = &self.input[src];
                self.memory.write(dst.start as i64, data)?;
            }
            Opcode::MLoad => {
                let offset = self.stack.peek(0)?;
                let value = low_word(self.memory.read(offset, WORD_SIZE as i64)?);
                self.stack.pop()?;
                self.stack.push(value);
            }
            Opcode::MStore => {
                let offset = self.stack.peek(0)?;
                let value = self.stack.peek(1)?;
                self.memory.check(offset, WORD_SIZE as i64)?;
                self.stack.pop()?;
                self.stack.pop()?;
                self.memory.write(offset, &value.to_be_bytes())?;
            }
            Opcode::Push1 => {
                let range = checked_range("bytecode", self.ip as i64, 1, self.code.len())?;
                let value = self.code[range.start];
                self.ip = range.end;
                self.stack.push(value as i64);
            }
            Opcode::Dup1 => {
                let top = self.stack.peek(0)?;
                self.stack.push(top);
            }
            Opcode::Swap1 => {
                self.stack.require(2)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a);
                self.stack.push(b);
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Pops the right then the left operand and pushes `op(left, right)`.
    fn binary(&mut self, op: fn(i64, i64) -> i64) -> Result<(), VMError> {
        self.stack.require(2)?;
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;
        self.stack.push(op(left, right));
        Ok(())
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Current instruction pointer.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Instructions executed so far, `STOP` included.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

/// Low-order 64 bits of a big-endian window.
fn low_word(window: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    let tail = &window[window.len().saturating_sub(8)..];
    buf[8 - tail.len()..].copy_from_slice(tail);
    i64::from_be_bytes(buf)
}
