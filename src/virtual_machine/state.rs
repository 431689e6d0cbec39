//! Per-contract persistent state.
//!
//! [`ContractStorage`] is the typed record the ledger keeps for every deployed
//! contract: the code that runs, the ABI used to build call input, and an
//! ordered word-to-word slot map. The instruction set does not address slots
//! yet; they are carried so storage stays a fixed shape as it grows.

use std::collections::BTreeMap;

/// 32-byte storage key or value.
pub type SlotWord = [u8; 32];

/// Storage of a single contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractStorage {
    bytecode: Vec<u8>,
    abi: Vec<u8>,
    slots: BTreeMap<SlotWord, SlotWord>,
}

impl ContractStorage {
    /// Creates storage holding `bytecode` and `abi` with no slots.
    pub fn new(bytecode: Vec<u8>, abi: Vec<u8>) -> Self {
        Self {
            bytecode,
            abi,
            slots: BTreeMap::new(),
        }
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Raw ABI description bytes, as supplied at deployment.
    pub fn abi(&self) -> &[u8] {
        &self.abi
    }

    /// Returns the slot value, or `None` if never written.
    pub fn slot(&self, key: &SlotWord) -> Option<&SlotWord> {
        self.slots.get(key)
    }

    pub fn set_slot(&mut self, key: SlotWord, value: SlotWord) -> Option<SlotWord> {
        self.slots.insert(key, value)
    }

    pub fn remove_slot(&mut self, key: &SlotWord) -> Option<SlotWord> {
        self.slots.remove(key)
    }

    /// Slots in ascending key order.
    pub fn slots(&self) -> impl Iterator<Item = (&SlotWord, &SlotWord)> {
        self.slots.iter()
    }
}
