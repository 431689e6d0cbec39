//! Storage subsystem.
//!
//! - [`storage_trait`]: [`ContractStore`](storage_trait::ContractStore) persistence seam
//! - [`memory_store`]: DashMap-backed store
//! - [`file_store`]: One JSON file per contract
//! - [`txpool`]: Pending transaction pool

pub mod file_store;
pub mod memory_store;
pub mod storage_trait;
pub mod txpool;
