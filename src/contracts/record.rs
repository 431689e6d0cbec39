use crate::types::address::Address;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Persisted description of a deployed contract, keyed by its address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub address: Address,
    pub name: String,
    /// Source the contract was compiled from.
    pub source: String,
    /// ABI description as JSON text.
    pub abi: String,
    /// Deployed bytecode as hex.
    pub bytecode: String,
    /// Unix seconds.
    pub created_at: u64,
    /// Unix seconds.
    pub updated_at: u64,
}

impl ContractRecord {
    pub fn new(
        address: Address,
        name: impl Into<String>,
        source: impl Into<String>,
        abi: impl Into<String>,
        bytecode: &[u8],
    ) -> Self {
        let now = unix_now();
        Self {
            address,
            name: name.into(),
            source: source.into(),
            abi: abi.into(),
            bytecode: hex::encode(bytecode),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = unix_now().max(self.created_at);
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_hex_encodes_bytecode() {
        let record = ContractRecord::new(Address([1; 20]), "Counter", "contract Counter {}", "[]", &[0x60, 0x01, 0x00]);
        assert_eq!(record.bytecode, "600100");
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn touch_never_goes_backwards() {
        let mut record = ContractRecord::new(Address([1; 20]), "A", "", "[]", &[]);
        record.created_at = u64::MAX;
        record.touch();
        assert_eq!(record.updated_at, u64::MAX);
    }

    #[test]
    fn json_round_trip_keeps_address() {
        let record = ContractRecord::new(Address([2; 20]), "A", "src", "[]", &[0]);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(&"02".repeat(20)));
        let back: ContractRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
