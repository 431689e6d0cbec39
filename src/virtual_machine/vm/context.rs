use crate::virtual_machine::abi::Abi;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::state::ContractStorage;
use crate::virtual_machine::vm::{ExecutionLimits, VM, Word};

/// What a successful call leaves behind.
///
/// The instruction set has no `RETURN`, so a call never produces return data;
/// the final stack and step count are exposed for inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOutcome {
    pub steps: u64,
    pub stack: Vec<Word>,
}

/// Execution context of one contract call.
///
/// Borrows the contract's storage for the duration of the call and creates a
/// fresh [`VM`] (stack and memory) for every call. Nothing outlives the
/// context except what the call wrote into storage.
pub struct ExecContext<'a> {
    storage: &'a mut ContractStorage,
    limits: ExecutionLimits,
}

impl<'a> ExecContext<'a> {
    pub fn new(storage: &'a mut ContractStorage, limits: ExecutionLimits) -> Self {
        Self { storage, limits }
    }

    /// Calls the contract.
    ///
    /// With a signature, the call input is built from the stored ABI and the
    /// string `args`. Without one (deployment), the raw bytecode runs with an
    /// empty input and `args` are ignored.
    pub fn call(&mut self, signature: Option<&str>, args: &[String]) -> Result<CallOutcome, VMError> {
        let input = match signature {
            Some(name) if !name.is_empty() => Abi::from_json(self.storage.abi())?.encode_call(name, args)?,
            _ => Vec::new(),
        };
        self.execute(input)
    }

    /// Runs the stored bytecode over a prepared call input.
    pub fn execute(&mut self, input: Vec<u8>) -> Result<CallOutcome, VMError> {
        let mut vm = VM::new(self.storage.bytecode(), input, self.limits);
        vm.run()?;
        Ok(CallOutcome {
            steps: vm.steps(),
            stack: vm.stack().as_slice().to_vec(),
        })
    }

    pub fn storage(&self) -> &ContractStorage {
        self.storage
    }
}
