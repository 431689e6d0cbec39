//! Pool of transactions waiting for the next sealed block.
//!
//! Transactions are kept in arrival order; sealing takes the whole pool.

use crate::core::config::TXPOOL_CAPACITY;
use crate::core::errors::LedgerError;
use crate::core::transaction::Transaction;
use crate::warn;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe FIFO of pending transactions with a fixed capacity.
#[derive(Debug)]
pub struct TxPool {
    capacity: usize,
    pending: Mutex<Vec<Transaction>>,
}

impl TxPool {
    /// Creates a pool holding at most `capacity` transactions.
    ///
    /// Uses `TXPOOL_CAPACITY` if `None` is provided.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.unwrap_or(TXPOOL_CAPACITY).max(1),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Transaction>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues a transaction, failing with [`LedgerError::PoolFull`] at capacity.
    pub fn append(&self, transaction: Transaction) -> Result<(), LedgerError> {
        let mut pending = self.lock();
        if pending.len() >= self.capacity {
            warn!("transaction pool full, rejecting transaction from {}", transaction.sender);
            return Err(LedgerError::PoolFull(pending.len()));
        }
        pending.push(transaction);
        Ok(())
    }

    /// Removes and returns every pending transaction in arrival order.
    pub fn take_all(&self) -> Vec<Transaction> {
        std::mem::take(&mut *self.lock())
    }

    /// Puts transactions back in front of anything queued since they were taken.
    pub fn restore(&self, transactions: Vec<Transaction>) {
        let mut pending = self.lock();
        let newer = std::mem::replace(&mut *pending, transactions);
        pending.extend(newer);
    }

    /// Copy of the pending transactions in arrival order.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.lock().clone()
    }

    pub fn length(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TxPool {
    fn default() -> Self {
        Self::new(None)
    }
}
