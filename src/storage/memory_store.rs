use crate::contracts::record::ContractRecord;
use crate::storage::storage_trait::{ContractStore, StorageError};
use crate::types::address::Address;
use dashmap::DashMap;

/// In-memory [`ContractStore`], used by default and in tests.
#[derive(Debug, Default)]
pub struct MemoryContractStore {
    records: DashMap<Address, ContractRecord>,
}

impl MemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ContractStore for MemoryContractStore {
    fn persist(&self, record: &ContractRecord) -> Result<(), StorageError> {
        self.records.insert(record.address, record.clone());
        Ok(())
    }

    fn retrieve(&self, address: &Address) -> Result<Option<ContractRecord>, StorageError> {
        Ok(self.records.get(address).map(|r| r.value().clone()))
    }

    fn retrieve_all(&self) -> Result<Vec<ContractRecord>, StorageError> {
        let mut all: Vec<ContractRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|r| r.address);
        Ok(all)
    }

    fn remove(&self, address: &Address) -> Result<Option<ContractRecord>, StorageError> {
        Ok(self.records.remove(address).map(|(_, r)| r))
    }
}
