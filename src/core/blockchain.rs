//! Ledger state machine: the chain, contract storage and block sealing.

use crate::core::block::{Block, GENESIS_PREVIOUS_HASH};
use crate::core::config::LedgerConfig;
use crate::core::errors::LedgerError;
use crate::core::proof::ProofOfWork;
use crate::core::receipt::{Outcome, Receipt};
use crate::core::transaction::{Transaction, TransactionKind};
use crate::types::address::Address;
use crate::types::hash::Hash;
use crate::virtual_machine::isa::disassemble;
use crate::virtual_machine::state::ContractStorage;
use crate::virtual_machine::vm::{CallOutcome, ExecContext, ExecutionLimits};
use crate::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Owns the block sequence and the address-to-storage map.
///
/// Sealing is split in two so the proof-of-work search can run without
/// holding the ledger: [`next_previous_hash`](Self::next_previous_hash) gives
/// the value to mine against, [`commit_block`](Self::commit_block) appends and
/// applies once a nonce is found. [`seal_block`](Self::seal_block) does both.
pub struct Blockchain {
    chain: Vec<Block>,
    contracts: BTreeMap<Address, ContractStorage>,
    /// Receipts of every block, indexed by `block.index - 1`.
    receipts: Vec<Vec<Receipt>>,
    pow: ProofOfWork,
    limits: ExecutionLimits,
}

impl Blockchain {
    /// Creates a ledger and seals the genesis block.
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let mut chain = Self::empty(config)?;
        chain.seal_block(Vec::new())?;
        Ok(chain)
    }

    /// Creates a ledger without a genesis block.
    ///
    /// The caller must commit the genesis block before using the ledger.
    pub fn empty(config: &LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            chain: Vec::new(),
            contracts: BTreeMap::new(),
            receipts: Vec::new(),
            pow: ProofOfWork::new(config.difficulty_bits)?,
            limits: config.limits,
        })
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Number of blocks in the chain.
    pub fn height(&self) -> u64 {
        self.chain.len() as u64
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Previous-hash the next block will carry.
    pub fn next_previous_hash(&self) -> String {
        match self.chain.last() {
            Some(block) => block.hash(),
            None => GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    /// Receipts of the block at `index` (1-based).
    pub fn receipts(&self, index: u64) -> Option<&[Receipt]> {
        let slot = usize::try_from(index.checked_sub(1)?).ok()?;
        self.receipts.get(slot).map(Vec::as_slice)
    }

    pub fn storage(&self, address: &Address) -> Option<&ContractStorage> {
        self.contracts.get(address)
    }

    /// Deployed contracts in address order.
    pub fn contracts(&self) -> impl Iterator<Item = (&Address, &ContractStorage)> {
        self.contracts.iter()
    }

    pub fn contract_count(&self) -> usize {
        self.contracts.len()
    }

    /// Address a deployment from `sender` gets when `deployed` contracts exist.
    ///
    /// The sender is length-prefixed so no two `(sender, deployed)` pairs hash
    /// the same input.
    pub fn contract_address(sender: &str, deployed: usize) -> Address {
        let hash = Hash::sha3()
            .chain(&(sender.len() as u64).to_be_bytes())
            .chain(sender.as_bytes())
            .chain(deployed.to_string().as_bytes())
            .finalize();
        Address::from_hash(&hash)
    }

    /// Mines and commits a block holding `transactions`.
    pub fn seal_block(&mut self, transactions: Vec<Transaction>) -> Result<&Block, LedgerError> {
        let previous_hash = self.next_previous_hash();
        let proof = self.pow.mine(&previous_hash)?;
        self.commit_block(previous_hash, proof, transactions)
    }

    /// Appends a block for an already mined proof, then applies its transactions.
    ///
    /// Fails without touching the ledger if `previous_hash` is not the current
    /// tip or `proof` does not meet the target. Individual transaction failures
    /// never fail the block; they are logged and kept as receipts.
    pub fn commit_block(
        &mut self,
        previous_hash: String,
        proof: u64,
        transactions: Vec<Transaction>,
    ) -> Result<&Block, LedgerError> {
        let expected = self.next_previous_hash();
        if previous_hash != expected {
            return Err(LedgerError::StaleProof {
                mined_on: previous_hash,
                expected,
            });
        }
        let index = self.height() + 1;
        if !self.pow.is_valid(&previous_hash, proof) {
            return Err(LedgerError::InvalidBlock {
                index,
                reason: format!("proof {proof} does not meet the difficulty target"),
            });
        }

        let block = Block {
            index,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            transactions,
            proof,
            previous_hash,
        };
        // Transitions run against the appended block, in pool order
        let pending = block.transactions.clone();
        self.chain.push(block);

        let mut receipts = Vec::with_capacity(pending.len());
        for (position, tx) in pending.iter().enumerate() {
            let outcome = match self.apply_transaction(tx) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("transaction {position} of block {index} failed: {e}");
                    Outcome::Failed(e.to_string())
                }
            };
            receipts.push(Receipt {
                block_index: index,
                position,
                outcome,
            });
        }
        self.receipts.push(receipts);

        let block = &self.chain[self.chain.len() - 1];
        info!(
            "sealed block: index={} hash={} proof={} transactions={}",
            block.index,
            block.hash(),
            block.proof,
            block.transactions.len()
        );
        Ok(block)
    }

    /// Applies one transaction to contract storage.
    ///
    /// Storage is only written when the call succeeds: deployments that fail
    /// never get an address, failed invocations leave the previous storage.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<Outcome, LedgerError> {
        match tx.kind() {
            TransactionKind::Deploy => {
                let address = Self::contract_address(&tx.sender, self.contracts.len());
                if self.contracts.contains_key(&address) {
                    return Err(LedgerError::AddressOccupied(address));
                }
                let mut storage = ContractStorage::new(tx.bytecode.clone(), tx.abi.clone());
                if let Err(e) = ExecContext::new(&mut storage, self.limits).call(None, &[]) {
                    debug!(
                        "rejected deployment from {}:\n{}",
                        tx.sender,
                        disassemble(&tx.bytecode).join("\n")
                    );
                    return Err(e.into());
                }
                self.contracts.insert(address, storage);
                info!("deployed contract {address} from {}", tx.sender);
                Ok(Outcome::Deployed(address))
            }
            TransactionKind::Invoke => {
                let function = tx.function_signature.as_deref().unwrap_or_default();
                let (address, mut storage) = self.scratch_storage(&tx.recipient)?;
                ExecContext::new(&mut storage, self.limits).call(Some(function), &tx.arguments)?;
                self.contracts.insert(address, storage);
                Ok(Outcome::Invoked(address))
            }
            TransactionKind::Transfer => Ok(Outcome::Recorded),
        }
    }

    /// Runs `function` against a copy of the contract's storage and discards it.
    pub fn call_contract(
        &self,
        address: &str,
        function: &str,
        arguments: &[String],
    ) -> Result<CallOutcome, LedgerError> {
        let (_, mut storage) = self.scratch_storage(address)?;
        Ok(ExecContext::new(&mut storage, self.limits).call(Some(function), arguments)?)
    }

    fn scratch_storage(&self, address: &str) -> Result<(Address, ContractStorage), LedgerError> {
        let not_found = || LedgerError::ContractNotFound(address.to_string());
        let parsed: Address = address.parse().map_err(|_| not_found())?;
        let storage = self.contracts.get(&parsed).ok_or_else(not_found)?;
        Ok((parsed, storage.clone()))
    }

    /// Re-checks every link and proof of the chain.
    pub fn validate_chain(&self) -> Result<(), LedgerError> {
        let mut expected_previous = GENESIS_PREVIOUS_HASH.to_string();
        for (i, block) in self.chain.iter().enumerate() {
            let invalid = |reason: String| LedgerError::InvalidBlock {
                index: block.index,
                reason,
            };
            if block.index != i as u64 + 1 {
                return Err(invalid(format!("expected index {}", i + 1)));
            }
            if block.previous_hash != expected_previous {
                return Err(invalid(format!(
                    "previous hash {} does not match {expected_previous}",
                    block.previous_hash
                )));
            }
            if !self.pow.is_valid(&block.previous_hash, block.proof) {
                return Err(invalid(format!("proof {} does not meet the target", block.proof)));
            }
            expected_previous = block.hash();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::{SAMPLE_ABI, test_config};
    use crate::virtual_machine::errors::VMError;
    use crate::virtual_machine::isa::Opcode;

    const STOP_CODE: [u8; 1] = [Opcode::Stop as u8];

    fn ledger() -> Blockchain {
        Blockchain::new(&test_config()).unwrap()
    }

    fn deploy_tx(sender: &str, code: &[u8]) -> Transaction {
        Transaction::deploy(sender, code.to_vec(), SAMPLE_ABI.as_bytes().to_vec())
    }

    #[test]
    fn new_creates_genesis() {
        let chain = ledger();
        assert_eq!(chain.height(), 1);
        let genesis = chain.last_block().unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
        assert_eq!(chain.receipts(1), Some(&[][..]));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = LedgerConfig {
            difficulty_bits: 300,
            ..test_config()
        };
        assert!(matches!(Blockchain::new(&config), Err(LedgerError::InvalidDifficulty(300))));
    }

    #[test]
    fn blocks_link_to_their_predecessor() {
        let mut chain = ledger();
        chain.seal_block(vec![Transaction::transfer("alice", "bob", "5")]).unwrap();
        chain.seal_block(vec![]).unwrap();
        let blocks = chain.chain();
        assert_eq!(blocks.len(), 3);
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash());
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
        assert!(chain.validate_chain().is_ok());
    }

    #[test]
    fn sealed_proofs_meet_target() {
        let mut chain = ledger();
        chain.seal_block(vec![]).unwrap();
        for block in chain.chain() {
            assert!(chain.proof_of_work().is_valid(&block.previous_hash, block.proof));
        }
    }

    #[test]
    fn transfer_is_recorded_without_transition() {
        let mut chain = ledger();
        let block = chain
            .seal_block(vec![Transaction::transfer("alice", "bob", "10")])
            .unwrap()
            .clone();
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(chain.contract_count(), 0);
        assert_eq!(chain.receipts(block.index).unwrap()[0].outcome, Outcome::Recorded);
    }

    #[test]
    fn deploy_then_invoke_round_trips_address() {
        let mut chain = ledger();
        chain.seal_block(vec![deploy_tx("alice", &STOP_CODE)]).unwrap();
        let address = chain.receipts(2).unwrap()[0].deployed_address().unwrap();
        assert_eq!(address, Blockchain::contract_address("alice", 0));
        assert!(chain.storage(&address).is_some());

        let invoke = Transaction::invoke("bob", address.to_string(), "set", vec!["5".into()]);
        chain.seal_block(vec![invoke]).unwrap();
        assert_eq!(chain.receipts(3).unwrap()[0].outcome, Outcome::Invoked(address));
    }

    #[test]
    fn invoking_missing_contract_leaves_state_untouched() {
        let mut chain = ledger();
        chain.seal_block(vec![deploy_tx("alice", &STOP_CODE)]).unwrap();
        let before: Vec<_> = chain.contracts().map(|(a, s)| (*a, s.clone())).collect();

        let missing = Address([0xAB; 20]).to_string();
        let err = chain
            .apply_transaction(&Transaction::invoke("bob", missing.clone(), "set", vec!["1".into()]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ContractNotFound(a) if a == missing));

        let err = chain
            .apply_transaction(&Transaction::invoke("bob", "not-an-address", "set", vec![]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ContractNotFound(_)));

        let after: Vec<_> = chain.contracts().map(|(a, s)| (*a, s.clone())).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn unknown_function_fails_without_mutation() {
        let mut chain = ledger();
        chain.seal_block(vec![deploy_tx("alice", &STOP_CODE)]).unwrap();
        let address = Blockchain::contract_address("alice", 0);
        let before = chain.storage(&address).cloned();

        let tx = Transaction::invoke("bob", address.to_string(), "missing", vec![]);
        let err = chain.apply_transaction(&tx).unwrap_err();
        assert!(matches!(err, LedgerError::Execution(VMError::FunctionNotFound(_))));
        assert_eq!(chain.storage(&address).cloned(), before);
    }

    #[test]
    fn failed_deployment_gets_no_address() {
        let mut chain = ledger();
        chain.seal_block(vec![deploy_tx("alice", &[0xFE])]).unwrap();
        assert_eq!(chain.contract_count(), 0);
        let receipt = &chain.receipts(2).unwrap()[0];
        assert!(matches!(&receipt.outcome, Outcome::Failed(reason) if reason.contains("0xfe")));
        // the failed attempt does not consume a deployment slot
        chain.seal_block(vec![deploy_tx("alice", &STOP_CODE)]).unwrap();
        assert!(chain.storage(&Blockchain::contract_address("alice", 0)).is_some());
    }

    #[test]
    fn failing_invocation_does_not_abort_block() {
        let mut chain = ledger();
        let missing = Address([1; 20]).to_string();
        let block = chain
            .seal_block(vec![
                Transaction::invoke("bob", missing, "set", vec!["1".into()]),
                deploy_tx("alice", &STOP_CODE),
            ])
            .unwrap()
            .clone();

        assert_eq!(block.transactions.len(), 2);
        assert_eq!(chain.contract_count(), 1);
        let receipts = chain.receipts(block.index).unwrap();
        assert!(matches!(receipts[0].outcome, Outcome::Failed(_)));
        assert!(matches!(receipts[1].outcome, Outcome::Deployed(_)));
        assert!(chain.storage(&Blockchain::contract_address("alice", 0)).is_some());
    }

    #[test]
    fn addresses_depend_on_sender_and_count() {
        let a0 = Blockchain::contract_address("alice", 0);
        assert_eq!(a0, Blockchain::contract_address("alice", 0));
        assert_ne!(a0, Blockchain::contract_address("alice", 1));
        assert_ne!(a0, Blockchain::contract_address("bob", 0));
    }

    #[test]
    fn sender_and_count_do_not_run_together() {
        assert_ne!(
            Blockchain::contract_address("a1", 0),
            Blockchain::contract_address("a", 10)
        );
        assert_ne!(
            Blockchain::contract_address("a", 11),
            Blockchain::contract_address("a1", 1)
        );
    }

    #[test]
    fn deployment_onto_occupied_address_fails() {
        let mut chain = ledger();
        chain.seal_block(vec![deploy_tx("bob", &STOP_CODE)]).unwrap();
        let taken = Blockchain::contract_address("alice", 1);
        let existing = ContractStorage::new(vec![Opcode::Stop as u8, 0x07], Vec::new());
        chain.contracts.insert(taken, existing.clone());

        let block = chain.seal_block(vec![deploy_tx("alice", &STOP_CODE)]).unwrap().clone();
        let receipt = &chain.receipts(block.index).unwrap()[0];
        assert!(matches!(&receipt.outcome, Outcome::Failed(reason) if reason.contains("already holds")));
        assert_eq!(chain.storage(&taken), Some(&existing));
        assert_eq!(chain.contract_count(), 2);
        assert!(matches!(
            chain.apply_transaction(&deploy_tx("alice", &STOP_CODE)),
            Err(LedgerError::AddressOccupied(a)) if a == taken
        ));
    }

    #[test]
    fn sequential_deployments_get_distinct_addresses() {
        let mut chain = ledger();
        chain
            .seal_block(vec![deploy_tx("alice", &STOP_CODE), deploy_tx("alice", &STOP_CODE)])
            .unwrap();
        let receipts = chain.receipts(2).unwrap();
        let first = receipts[0].deployed_address().unwrap();
        let second = receipts[1].deployed_address().unwrap();
        assert_ne!(first, second);
        assert_eq!(second, Blockchain::contract_address("alice", 1));
    }

    #[test]
    fn commit_rejects_stale_previous_hash() {
        let mut chain = ledger();
        let previous = chain.next_previous_hash();
        let proof = chain.proof_of_work().mine(&previous).unwrap();
        chain.seal_block(vec![]).unwrap();
        let err = chain.commit_block(previous, proof, vec![]).unwrap_err();
        assert!(matches!(err, LedgerError::StaleProof { .. }));
        assert_eq!(chain.height(), 2);
    }

    #[test]
    fn commit_rejects_invalid_proof() {
        let mut chain = ledger();
        let previous = chain.next_previous_hash();
        let bad = (0..).find(|n| !chain.proof_of_work().is_valid(&previous, *n)).unwrap();
        let err = chain.commit_block(previous, bad, vec![]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidBlock { index: 2, .. }));
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn validate_chain_detects_tampering() {
        let mut chain = ledger();
        chain.seal_block(vec![]).unwrap();
        chain.chain[1].previous_hash = "tampered".into();
        assert!(matches!(
            chain.validate_chain(),
            Err(LedgerError::InvalidBlock { index: 2, .. })
        ));
    }

    #[test]
    fn call_contract_does_not_commit() {
        let mut chain = ledger();
        chain.seal_block(vec![deploy_tx("alice", &STOP_CODE)]).unwrap();
        let address = Blockchain::contract_address("alice", 0).to_string();
        let outcome = chain.call_contract(&address, "set", &["3".into()]).unwrap();
        assert!(outcome.stack.is_empty());
        assert!(matches!(
            chain.call_contract(&address, "set", &["x".into()]),
            Err(LedgerError::Execution(VMError::ArgumentParseError { .. }))
        ));
    }

    #[test]
    fn empty_ledger_starts_with_sentinel() {
        let chain = Blockchain::empty(&test_config()).unwrap();
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.next_previous_hash(), "1");
        assert!(chain.last_block().is_none());
    }
}
