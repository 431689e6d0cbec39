use super::*;
use crate::utils::test_utils::utils::{SAMPLE_ABI, contract_storage};
use crate::virtual_machine::abi::Abi;
use crate::virtual_machine::isa::Opcode;

const STOP: u8 = Opcode::Stop as u8;
const ADD: u8 = Opcode::Add as u8;
const MUL: u8 = Opcode::Mul as u8;
const CALLDATALOAD: u8 = Opcode::CallDataLoad as u8;
const CALLDATASIZE: u8 = Opcode::CallDataSize as u8;
const CALLDATACOPY: u8 = Opcode::CallDataCopy as u8;
const MLOAD: u8 = Opcode::MLoad as u8;
const MSTORE: u8 = Opcode::MStore as u8;
const PUSH1: u8 = Opcode::Push1 as u8;
const DUP1: u8 = Opcode::Dup1 as u8;
const SWAP1: u8 = Opcode::Swap1 as u8;

fn run_with(code: &[u8], input: &[u8], limits: ExecutionLimits) -> (VM, Result<(), VMError>) {
    let mut vm = VM::new(code, input, limits);
    let result = vm.run();
    (vm, result)
}

fn run(code: &[u8]) -> (VM, Result<(), VMError>) {
    run_with(code, &[], ExecutionLimits::default())
}

fn run_input(code: &[u8], input: &[u8]) -> (VM, Result<(), VMError>) {
    run_with(code, input, ExecutionLimits::default())
}

/// Runs everything but the last instruction, then steps the last one by hand
/// so the pre-instruction state can be compared with the post-failure state.
fn state_around_failure(prefix: &[u8], failing: Opcode, input: &[u8]) -> (Stack, Memory, VMError) {
    let mut code = prefix.to_vec();
    code.push(STOP);
    let (mut vm, result) = run_input(&code, input);
    assert_eq!(result, Ok(()));
    let (stack, memory) = (vm.stack().clone(), vm.memory().clone());
    let err = vm.exec(failing).unwrap_err();
    assert_eq!(vm.stack(), &stack);
    assert_eq!(vm.memory(), &memory);
    (stack, memory, err)
}

// ==================== Scenarios ====================

#[test]
fn push_push_add_stop_leaves_sum() {
    let (vm, result) = run(&hex::decode("6001600201 00".replace(' ', "")).unwrap());
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[3]);
}

#[test]
fn unknown_byte_fails() {
    let (_, result) = run(&[0xFE]);
    assert_eq!(result, Err(VMError::UnknownOpcode(0xFE)));
}

#[test]
fn missing_stop_is_unterminated() {
    let (vm, result) = run(&[PUSH1, 1]);
    assert_eq!(result, Err(VMError::UnterminatedExecution));
    assert_eq!(vm.stack().as_slice(), &[1]);
}

#[test]
fn empty_code_is_unterminated() {
    let (vm, result) = run(&[]);
    assert_eq!(result, Err(VMError::UnterminatedExecution));
    assert_eq!(vm.steps(), 0);
}

#[test]
fn unknown_opcode_after_valid_prefix_keeps_prefix_effects() {
    let (vm, result) = run(&[PUSH1, 9, 0xAB, STOP]);
    assert_eq!(result, Err(VMError::UnknownOpcode(0xAB)));
    assert_eq!(vm.stack().as_slice(), &[9]);
    assert_eq!(vm.ip(), 2);
}

#[test]
fn stop_ignores_trailing_garbage() {
    let (vm, result) = run(&[PUSH1, 4, STOP, 0xFE, 0xFF]);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[4]);
}

#[test]
fn only_stop_halts() {
    let (mut vm, _) = run(&[PUSH1, 1, STOP]);
    assert_eq!(vm.exec(Opcode::Stop), Ok(std::ops::ControlFlow::Break(())));
    assert_eq!(vm.exec(Opcode::Dup1), Ok(std::ops::ControlFlow::Continue(())));
    assert_eq!(vm.stack().as_slice(), &[1, 1]);
}

// ==================== Arithmetic ====================

#[test]
fn mul_multiplies() {
    let (vm, result) = run(&[PUSH1, 6, PUSH1, 7, MUL, STOP]);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[42]);
}

#[test]
fn arithmetic_wraps() {
    // repeated squaring overflows i64
    let mut code = vec![PUSH1, 0xFF];
    for _ in 0..8 {
        code.extend([DUP1, MUL]);
    }
    code.push(STOP);
    let (vm, result) = run(&code);
    assert_eq!(result, Ok(()));
    let mut expected: i64 = 255;
    for _ in 0..8 {
        expected = expected.wrapping_mul(expected);
    }
    assert_eq!(vm.stack().as_slice(), &[expected]);
}

#[test]
fn add_needs_two_operands() {
    let (vm, result) = run(&[PUSH1, 1, ADD, STOP]);
    assert_eq!(
        result,
        Err(VMError::StackUnderflow {
            required: 2,
            available: 1
        })
    );
    assert_eq!(vm.stack().as_slice(), &[1]);
}

// ==================== Stack ops ====================

#[test]
fn dup1_copies_top() {
    let (vm, result) = run(&[PUSH1, 5, DUP1, STOP]);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[5, 5]);
}

#[test]
fn dup1_on_empty_underflows() {
    let (_, result) = run(&[DUP1, STOP]);
    assert!(matches!(result, Err(VMError::StackUnderflow { .. })));
}

#[test]
fn swap1_swaps_top_two() {
    let (vm, result) = run(&[PUSH1, 1, PUSH1, 2, SWAP1, STOP]);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[2, 1]);
}

#[test]
fn swap1_with_one_value_leaves_it() {
    let (vm, result) = run(&[PUSH1, 1, SWAP1, STOP]);
    assert!(matches!(result, Err(VMError::StackUnderflow { required: 2, .. })));
    assert_eq!(vm.stack().as_slice(), &[1]);
}

#[test]
fn push1_past_end_is_out_of_bounds() {
    let (vm, result) = run(&[PUSH1]);
    assert!(matches!(
        result,
        Err(VMError::OutOfBounds {
            region: "bytecode",
            offset: 1,
            ..
        })
    ));
    assert!(vm.stack().is_empty());
}

// ==================== Memory ====================

#[test]
fn mstore_writes_eight_bytes_at_window_start() {
    // value 0x2a at offset 0
    let (vm, result) = run(&[PUSH1, 0x2A, PUSH1, 0, MSTORE, STOP]);
    assert_eq!(result, Ok(()));
    assert!(vm.stack().is_empty());
    let mem = vm.memory().as_slice();
    assert_eq!(&mem[..8], &[0, 0, 0, 0, 0, 0, 0, 0x2A]);
    assert!(mem[8..].iter().all(|&b| b == 0));
}

#[test]
fn mload_reads_low_bytes_of_window() {
    // store at 24 so the value lands in the low 8 bytes of the window at 0
    let (vm, result) = run(&[PUSH1, 0x2A, PUSH1, 24, MSTORE, PUSH1, 0, MLOAD, STOP]);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[0x2A]);
}

#[test]
fn mload_at_store_offset_does_not_see_value() {
    let (vm, result) = run(&[PUSH1, 0x2A, PUSH1, 0, MSTORE, PUSH1, 0, MLOAD, STOP]);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[0]);
}

#[test]
fn mstore_keeps_sign_bytes() {
    // PUSH1 cannot produce negative values
    let mut vm = VM::new(vec![STOP], vec![], ExecutionLimits::default());
    vm.stack.push(-1);
    vm.stack.push(0);
    vm.exec(Opcode::MStore).unwrap();
    assert_eq!(&vm.memory().as_slice()[..8], &[0xFF; 8]);
    assert_eq!(vm.memory().as_slice()[8], 0);
}

#[test]
fn mstore_window_must_fit() {
    let limits = ExecutionLimits {
        memory_size: 64,
        ..ExecutionLimits::default()
    };
    // offset 40 + 32 > 64 even though 40 + 8 would fit
    let (vm, result) = run_with(&[PUSH1, 1, PUSH1, 40, MSTORE, STOP], &[], limits);
    assert!(matches!(
        result,
        Err(VMError::OutOfBounds {
            region: "memory",
            offset: 40,
            size: 32,
            len: 64
        })
    ));
    assert_eq!(vm.stack().as_slice(), &[1, 40]);
    assert!(vm.memory().as_slice().iter().all(|&b| b == 0));
}

#[test]
fn failed_mstore_leaves_state_intact() {
    let limits = ExecutionLimits {
        memory_size: 16,
        ..ExecutionLimits::default()
    };
    let mut vm = VM::new(vec![STOP], vec![], limits);
    vm.stack.push(7);
    vm.stack.push(0);
    let before = (vm.stack().clone(), vm.memory().clone());
    assert!(vm.exec(Opcode::MStore).is_err());
    assert_eq!((vm.stack().clone(), vm.memory().clone()), before);
}

#[test]
fn failed_mload_leaves_state_intact() {
    let (stack, _, err) = state_around_failure(&[PUSH1, 0xFF, PUSH1, 0xFF, MUL], Opcode::MLoad, &[]);
    assert!(matches!(err, VMError::OutOfBounds { region: "memory", .. }));
    assert_eq!(stack.as_slice(), &[0xFF * 0xFF]);
}

#[test]
fn mstore_with_one_operand_underflows_without_popping() {
    let (stack, _, err) = state_around_failure(&[PUSH1, 0], Opcode::MStore, &[]);
    assert!(matches!(err, VMError::StackUnderflow { required: 2, available: 1 }));
    assert_eq!(stack.len(), 1);
}

#[test]
fn memory_size_follows_limits() {
    let limits = ExecutionLimits {
        memory_size: 128,
        ..ExecutionLimits::default()
    };
    let (vm, _) = run_with(&[STOP], &[], limits);
    assert_eq!(vm.memory().len(), 128);
}

// ==================== Call input ====================

fn word_with_low(value: u64) -> Vec<u8> {
    let mut word = vec![0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[test]
fn calldatasize_pushes_input_length() {
    let (vm, result) = run_input(&[CALLDATASIZE, STOP], &[1, 2, 3]);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[3]);
}

#[test]
fn calldataload_reads_low_word() {
    let mut input = vec![0xAA, 0xBB, 0xCC, 0xDD];
    input.extend(word_with_low(0x0102));
    let (vm, result) = run_input(&[PUSH1, 4, CALLDATALOAD, STOP], &input);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[0x0102]);
}

#[test]
fn calldataload_ignores_high_bytes() {
    let mut input = vec![0xFF; 24];
    input.extend(5u64.to_be_bytes());
    let (vm, result) = run_input(&[PUSH1, 0, CALLDATALOAD, STOP], &input);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.stack().as_slice(), &[5]);
}

#[test]
fn calldataload_past_end_fails_and_keeps_offset() {
    let (stack, _, err) = state_around_failure(&[PUSH1, 1], Opcode::CallDataLoad, &[0u8; 32]);
    assert!(matches!(
        err,
        VMError::OutOfBounds {
            region: "calldata",
            offset: 1,
            size: 32,
            len: 32
        }
    ));
    assert_eq!(stack.as_slice(), &[1]);
}

#[test]
fn calldatacopy_copies_into_memory() {
    // pops memory offset, input offset, length: push in reverse
    let input = [0x11, 0x22, 0x33, 0x44];
    let code = [PUSH1, 2, PUSH1, 1, PUSH1, 10, CALLDATACOPY, STOP];
    let (vm, result) = run_input(&code, &input);
    assert_eq!(result, Ok(()));
    assert!(vm.stack().is_empty());
    assert_eq!(&vm.memory().as_slice()[10..12], &[0x22, 0x33]);
    assert_eq!(vm.memory().as_slice()[9], 0);
    assert_eq!(vm.memory().as_slice()[12], 0);
}

#[test]
fn calldatacopy_checks_source_before_writing() {
    let input = [0x11, 0x22];
    let (stack, memory, err) =
        state_around_failure(&[PUSH1, 4, PUSH1, 0, PUSH1, 0], Opcode::CallDataCopy, &input);
    assert!(matches!(err, VMError::OutOfBounds { region: "calldata", .. }));
    assert_eq!(stack.as_slice(), &[4, 0, 0]);
    assert!(memory.as_slice().iter().all(|&b| b == 0));
}

#[test]
fn calldatacopy_checks_destination_before_writing() {
    let limits = ExecutionLimits {
        memory_size: 8,
        ..ExecutionLimits::default()
    };
    let code = [PUSH1, 4, PUSH1, 0, PUSH1, 6, CALLDATACOPY, STOP];
    let (vm, result) = run_with(&code, &[1, 2, 3, 4], limits);
    assert!(matches!(result, Err(VMError::OutOfBounds { region: "memory", .. })));
    assert_eq!(vm.stack().as_slice(), &[4, 0, 6]);
    assert!(vm.memory().as_slice().iter().all(|&b| b == 0));
}

#[test]
fn calldatacopy_with_zero_length_is_a_no_op() {
    let (vm, result) = run_input(&[PUSH1, 0, PUSH1, 0, PUSH1, 0, CALLDATACOPY, STOP], &[]);
    assert_eq!(result, Ok(()));
    assert!(vm.stack().is_empty());
}

// ==================== Budget ====================

#[test]
fn step_limit_stops_long_programs() {
    let limits = ExecutionLimits {
        step_limit: 3,
        ..ExecutionLimits::default()
    };
    let (vm, result) = run_with(&[PUSH1, 1, DUP1, DUP1, DUP1, STOP], &[], limits);
    assert_eq!(result, Err(VMError::ExecutionBudgetExceeded { limit: 3 }));
    assert_eq!(vm.steps(), 3);
    assert_eq!(vm.stack().len(), 3);
}

#[test]
fn program_within_limit_completes() {
    let limits = ExecutionLimits {
        step_limit: 4,
        ..ExecutionLimits::default()
    };
    let (vm, result) = run_with(&[PUSH1, 1, PUSH1, 2, ADD, STOP], &[], limits);
    assert_eq!(result, Ok(()));
    assert_eq!(vm.steps(), 4);
}

// ==================== Context ====================

#[test]
fn context_deploy_runs_raw_code_with_empty_input() {
    let mut storage = contract_storage(&[CALLDATASIZE, STOP]);
    let outcome = ExecContext::new(&mut storage, ExecutionLimits::default())
        .call(None, &[])
        .unwrap();
    assert_eq!(outcome.stack, vec![0]);
}

#[test]
fn context_invocation_builds_selector_input() {
    // leaves input size and the low word of the first argument
    let code = [CALLDATASIZE, PUSH1, 4, CALLDATALOAD, STOP];
    let mut storage = contract_storage(&code);
    let outcome = ExecContext::new(&mut storage, ExecutionLimits::default())
        .call(Some("set"), &["77".to_string()])
        .unwrap();
    assert_eq!(outcome.stack, vec![36, 77]);
    assert_eq!(outcome.steps, 4);
}

#[test]
fn context_reads_selector_from_input() {
    // window at 0 covers the selector and the zero high bytes of the argument
    let code = [PUSH1, 0, CALLDATALOAD, STOP];
    let mut storage = contract_storage(&code);
    let outcome = ExecContext::new(&mut storage, ExecutionLimits::default())
        .call(Some("set"), &["1".to_string()])
        .unwrap();
    assert_eq!(outcome.stack, vec![0]);
}

#[test]
fn context_unknown_function_fails_before_running() {
    let mut storage = contract_storage(&[0xFE]);
    let before = storage.clone();
    let err = ExecContext::new(&mut storage, ExecutionLimits::default())
        .call(Some("nope"), &[])
        .unwrap_err();
    assert!(matches!(err, VMError::FunctionNotFound(name) if name == "nope"));
    assert_eq!(storage, before);
}

#[test]
fn sample_abi_is_valid() {
    assert!(Abi::from_json(SAMPLE_ABI.as_bytes()).is_ok());
}
