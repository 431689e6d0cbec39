//! Instruction set definitions.
//!
//! [`for_each_opcode!`](crate::for_each_opcode) holds the canonical opcode list and
//! hands it to a callback macro, so the [`Opcode`] enum, its byte decoding and
//! its mnemonics are generated from one table.
//!
//! # Bytecode format
//!
//! Every instruction is a single opcode byte. `PUSH1` is the only instruction
//! with an immediate: the byte that follows it.
//!
//! Byte values follow the EVM assignments so compiler output for this subset
//! runs unchanged.

use crate::virtual_machine::errors::VMError;

/// Invokes `$callback` with the full opcode table.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// STOP ; halt successfully
            Stop = 0x00, "STOP", 0,
            /// ADD ; a = pop, b = pop, push b + a (wrapping)
            Add = 0x01, "ADD", 0,
            /// MUL ; a = pop, b = pop, push b * a (wrapping)
            Mul = 0x02, "MUL", 0,
            /// CALLDATALOAD ; off = pop, push low 64 bits of input[off..off+32]
            CallDataLoad = 0x35, "CALLDATALOAD", 0,
            /// CALLDATASIZE ; push len(input)
            CallDataSize = 0x36, "CALLDATASIZE", 0,
            /// CALLDATACOPY ; mem = pop, off = pop, len = pop, memory[mem..] = input[off..off+len]
            CallDataCopy = 0x37, "CALLDATACOPY", 0,
            /// MLOAD ; off = pop, push low 64 bits of memory[off..off+32]
            MLoad = 0x51, "MLOAD", 0,
            /// MSTORE ; off = pop, v = pop, memory[off..off+8] = v (big endian)
            MStore = 0x52, "MSTORE", 0,
            /// PUSH1 imm8 ; push imm8
            Push1 = 0x60, "PUSH1", 1,
            /// DUP1 ; push copy of top
            Dup1 = 0x80, "DUP1", 0,
            /// SWAP1 ; exchange the two topmost values
            Swap1 = 0x90, "SWAP1", 0,
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $byte:expr, $mnemonic:expr, $immediate:expr
        ),* $(,)?
    ) => {
        /// A decoded VM instruction.
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $byte,
            )*
        }

        impl Opcode {
            /// Every opcode in table order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name),*];

            /// Assembly mnemonic.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => $mnemonic,)*
                }
            }

            /// Number of immediate bytes that follow the opcode.
            pub const fn immediate_len(self) -> usize {
                match self {
                    $(Opcode::$name => $immediate,)*
                }
            }
        }

        impl TryFrom<u8> for Opcode {
            type Error = VMError;

            fn try_from(byte: u8) -> Result<Self, Self::Error> {
                match byte {
                    $(x if x == $byte => Ok(Opcode::$name),)*
                    other => Err(VMError::UnknownOpcode(other)),
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

/// Renders bytecode as one `offset: MNEMONIC [imm]` line per instruction.
///
/// Unknown bytes are shown as `INVALID 0x..` and a truncated `PUSH1` as
/// `PUSH1 <missing>`; disassembly never fails.
pub fn disassemble(code: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        match Opcode::try_from(byte) {
            Ok(op) if op.immediate_len() > 0 => match code.get(pc + 1) {
                Some(imm) => lines.push(format!("{pc:04}: {} 0x{imm:02x}", op.mnemonic())),
                None => lines.push(format!("{pc:04}: {} <missing>", op.mnemonic())),
            },
            Ok(op) => lines.push(format!("{pc:04}: {}", op.mnemonic())),
            Err(_) => lines.push(format!("{pc:04}: INVALID 0x{byte:02x}")),
        }
        pc += 1 + Opcode::try_from(byte).map(Opcode::immediate_len).unwrap_or(0);
    }
    lines
}
