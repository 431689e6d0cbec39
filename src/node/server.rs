//! Async service boundary around the ledger.
//!
//! [`Node`] is the single handle callers share: it serializes sealing, runs
//! proof-of-work on the blocking pool so readers and submitters are never held
//! up, and wires the compiler and contract store collaborators in.

use crate::contracts::compiler::{CompiledContract, Compiler, SolcCompiler};
use crate::contracts::record::ContractRecord;
use crate::core::block::Block;
use crate::core::blockchain::Blockchain;
use crate::core::config::LedgerConfig;
use crate::core::errors::LedgerError;
use crate::core::proof::ProofOfWork;
use crate::core::receipt::{Outcome, Receipt};
use crate::core::transaction::Transaction;
use crate::storage::memory_store::MemoryContractStore;
use crate::storage::storage_trait::ContractStore;
use crate::storage::txpool::TxPool;
use crate::types::address::Address;
use crate::virtual_machine::vm::CallOutcome;
use crate::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Collaborators and settings a node is started with.
pub struct NodeOptions {
    pub config: LedgerConfig,
    /// Where contract records are persisted.
    pub store: Arc<dyn ContractStore>,
    /// Used by [`Node::deploy_source`].
    pub compiler: Arc<dyn Compiler>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            config: LedgerConfig::default(),
            store: Arc::new(MemoryContractStore::new()),
            compiler: Arc::new(SolcCompiler::default()),
        }
    }
}

/// Shared handle to a running ledger.
pub struct Node {
    ledger: Arc<RwLock<Blockchain>>,
    tx_pool: Arc<TxPool>,
    /// Held for the whole of a seal, mining included.
    seal_lock: Mutex<()>,
    /// Set once by [`shutdown`](Node::shutdown); stops any running search.
    cancel: Arc<AtomicBool>,
    store: Arc<dyn ContractStore>,
    compiler: Arc<dyn Compiler>,
}

impl Node {
    /// Creates the ledger and seals its genesis block.
    pub async fn new(options: NodeOptions) -> Result<Self, LedgerError> {
        let NodeOptions {
            config,
            store,
            compiler,
        } = options;
        let node = Self {
            ledger: Arc::new(RwLock::new(Blockchain::empty(&config)?)),
            tx_pool: Arc::new(TxPool::new(Some(config.tx_pool_capacity))),
            seal_lock: Mutex::new(()),
            cancel: Arc::new(AtomicBool::new(false)),
            store,
            compiler,
        };
        info!(
            "starting ledger: difficulty={} bits step_limit={} memory={} bytes",
            config.difficulty_bits, config.limits.step_limit, config.limits.memory_size
        );
        node.seal_pool_with(Vec::new()).await?;
        Ok(node)
    }

    fn ensure_running(&self) -> Result<(), LedgerError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(LedgerError::Unavailable("node is shutting down".into()));
        }
        Ok(())
    }

    /// Enqueues a transaction for the next block.
    pub async fn submit_transaction(&self, transaction: Transaction) -> Result<(), LedgerError> {
        self.ensure_running()?;
        info!(
            "adding a new transaction to the pool: sender={} recipient={}",
            transaction.sender, transaction.recipient
        );
        self.tx_pool.append(transaction)
    }

    /// Mines a block over the current pool, appends it and applies its transactions.
    ///
    /// Transactions submitted while the search runs are included. If the block
    /// cannot be committed the taken transactions go back to the pool.
    pub async fn seal_block(&self) -> Result<Block, LedgerError> {
        let (block, _) = self.seal_pool_with(Vec::new()).await?;
        Ok(block)
    }

    /// Seals the pool followed by `extra` and returns the block with its receipts.
    ///
    /// Receipts are read under the same write lock as the commit, so the
    /// caller sees the outcome of exactly the transactions it passed in.
    async fn seal_pool_with(
        &self,
        extra: Vec<Transaction>,
    ) -> Result<(Block, Vec<Receipt>), LedgerError> {
        let _sealing = self.seal_lock.lock().await;
        self.ensure_running()?;
        let (previous_hash, proof) = self.mine_next().await?;

        let pooled = self.tx_pool.take_all();
        let mut transactions = pooled.clone();
        transactions.extend(extra);
        let mut ledger = self.ledger.write().await;
        match ledger.commit_block(previous_hash, proof, transactions) {
            Ok(block) => {
                let block = block.clone();
                let receipts = ledger.receipts(block.index).map(<[Receipt]>::to_vec).unwrap_or_default();
                Ok((block, receipts))
            }
            Err(e) => {
                warn!("failed to commit block: {e}");
                self.tx_pool.restore(pooled);
                Err(e)
            }
        }
    }

    /// Runs the proof-of-work search for the next block off the async runtime.
    ///
    /// The ledger is only read-locked long enough to copy the tip and target.
    async fn mine_next(&self) -> Result<(String, u64), LedgerError> {
        let (previous_hash, pow): (String, ProofOfWork) = {
            let ledger = self.ledger.read().await;
            (ledger.next_previous_hash(), ledger.proof_of_work().clone())
        };
        let cancel = self.cancel.clone();
        let target = previous_hash.clone();
        let proof = tokio::task::spawn_blocking(move || pow.mine_with_cancel(&target, &cancel))
            .await
            .map_err(|e| LedgerError::Unavailable(format!("mining task failed: {e}")))??;
        Ok((previous_hash, proof))
    }

    /// Cancels any running proof-of-work search and refuses further writes.
    pub fn shutdown(&self) {
        if !self.cancel.swap(true, Ordering::Relaxed) {
            info!("node shutting down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Snapshot of the whole chain.
    pub async fn chain(&self) -> Vec<Block> {
        self.ledger.read().await.chain().to_vec()
    }

    pub async fn last_block(&self) -> Option<Block> {
        self.ledger.read().await.last_block().cloned()
    }

    pub async fn height(&self) -> u64 {
        self.ledger.read().await.height()
    }

    /// Transactions waiting for the next block.
    pub fn pending(&self) -> Vec<Transaction> {
        self.tx_pool.snapshot()
    }

    pub async fn receipts(&self, index: u64) -> Option<Vec<Receipt>> {
        self.ledger.read().await.receipts(index).map(<[Receipt]>::to_vec)
    }

    pub async fn validate_chain(&self) -> Result<(), LedgerError> {
        self.ledger.read().await.validate_chain()
    }

    /// Calls `function` on a deployed contract without committing anything.
    ///
    /// Always returns no data on success: contracts cannot return values.
    pub async fn call_contract(
        &self,
        address: &str,
        function: &str,
        arguments: &[String],
    ) -> Result<CallOutcome, LedgerError> {
        self.ledger.read().await.call_contract(address, function, arguments)
    }

    /// Compiles `source`, deploys it in a new block and persists its record.
    pub async fn deploy_source(
        &self,
        sender: &str,
        source: &str,
        contract: Option<&str>,
    ) -> Result<ContractRecord, LedgerError> {
        let compiled = self.compiler.compile(source, contract).await?;
        self.deploy_compiled(sender, source, compiled).await
    }

    /// Deploys already compiled output in a new block and persists its record.
    pub async fn deploy_compiled(
        &self,
        sender: &str,
        source: &str,
        compiled: CompiledContract,
    ) -> Result<ContractRecord, LedgerError> {
        let code = compiled.code()?;
        let transaction = Transaction::deploy(sender, code.clone(), compiled.abi.clone().into_bytes());
        info!("deploying contract {} from {sender}", compiled.name);
        // Sealed directly so a concurrent seal cannot move it into another block
        let (_, receipts) = self.seal_pool_with(vec![transaction]).await?;
        let outcome = receipts.into_iter().last().map(|receipt| receipt.outcome);

        match outcome {
            Some(Outcome::Deployed(address)) => {
                let record = ContractRecord::new(address, compiled.name, source, compiled.abi, &code);
                self.store.persist(&record)?;
                info!("persisted contract {} at {address}", record.name);
                Ok(record)
            }
            Some(Outcome::Failed(reason)) => Err(LedgerError::TransactionFailed(reason)),
            other => Err(LedgerError::TransactionFailed(format!(
                "unexpected deployment outcome: {other:?}"
            ))),
        }
    }

    /// Persisted contract records.
    pub fn contracts(&self) -> Result<Vec<ContractRecord>, LedgerError> {
        Ok(self.store.retrieve_all()?)
    }

    pub fn contract(&self, address: &Address) -> Result<Option<ContractRecord>, LedgerError> {
        Ok(self.store.retrieve(address)?)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}
