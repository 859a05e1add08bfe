use std::collections::HashSet;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::account::AddressSummary;
use super::block::{Block, BlockContent};
use super::crypto::Address;
use super::pow::{self, PowError, Proof};
use super::transaction::Transaction;

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Proof of work failed: {0}")]
    ProofOfWork(#[from] PowError),

    #[error("Chain tip moved while mining on top of {expected}")]
    Stale { expected: String },

    #[error("Invalid block: {0}")]
    InvalidBlock(String),
}

/// Full copy of a node's ledger, as exchanged between peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChainSnapshot {
    /// The chain of blocks, genesis first
    pub chain: Vec<Block>,

    /// Transactions waiting for the next block
    pub pending: Vec<Transaction>,
}

/// Everything the proof-of-work search needs to build the next block
///
/// Taken from the ledger up front so the search can run without holding it.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: u64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
}

impl MiningJob {
    pub fn content(&self) -> BlockContent<'_> {
        BlockContent {
            index: self.index,
            transactions: &self.transactions,
        }
    }

    /// Runs the proof-of-work search for this job until it succeeds or `cancel` fires
    pub fn solve(&self, cancel: &CancellationToken) -> Result<Proof, PowError> {
        pow::proof_of_work_cancellable(&self.previous_hash, &self.content(), cancel)
    }
}

/// Represents the blockchain: the adopted chain plus the pending transaction pool
///
/// Holds no lock of its own. The owner serializes access.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks, never empty
    chain: Vec<Block>,

    /// Transactions to be included in the next block
    pending: Vec<Transaction>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Creates a new blockchain holding only the genesis block
    pub fn new() -> Self {
        Blockchain {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> &Block {
        // The genesis block is never removed.
        &self.chain[self.chain.len() - 1]
    }

    /// Copies the chain and the pending pool
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.chain.clone(),
            pending: self.pending.clone(),
        }
    }

    /// Creates a transaction without touching the ledger
    pub fn create_transaction(
        &self,
        amount: f64,
        sender: Address,
        recipient: Address,
    ) -> Transaction {
        Transaction::new(amount, sender, recipient)
    }

    /// Adds a transaction to the pending pool
    ///
    /// # Returns
    ///
    /// The index of the block that is expected to include this transaction
    pub fn add_to_pending(&mut self, transaction: Transaction) -> u64 {
        self.pending.push(transaction);
        self.last_block().index + 1
    }

    /// Captures the candidate block built from the current tip and pending pool
    pub fn mining_job(&self) -> MiningJob {
        let last = self.last_block();
        MiningJob {
            index: last.index + 1,
            previous_hash: last.hash.clone(),
            transactions: self.pending.clone(),
        }
    }

    /// Mines a new block with the pending transactions on the calling thread
    ///
    /// # Returns
    ///
    /// Result with the newly mined block
    pub fn mine(&mut self) -> Result<Block, BlockchainError> {
        let job = self.mining_job();
        let proof = pow::proof_of_work(&job.previous_hash, &job.content())?;
        self.append_mined(job, proof)
    }

    /// Appends the block found for `job`
    ///
    /// Fails with [`BlockchainError::Stale`] when the tip is no longer the one
    /// the job was built on. Only the transactions the block contains leave the
    /// pending pool.
    pub fn append_mined(&mut self, job: MiningJob, proof: Proof) -> Result<Block, BlockchainError> {
        if self.last_block().hash != job.previous_hash {
            return Err(BlockchainError::Stale {
                expected: job.previous_hash,
            });
        }
        if !pow::meets_difficulty(&proof.hash) {
            return Err(BlockchainError::InvalidBlock(format!(
                "digest {} misses the difficulty target",
                proof.hash
            )));
        }

        let mined: HashSet<&str> = job.transactions.iter().map(|tx| tx.id.as_str()).collect();
        self.pending.retain(|tx| !mined.contains(tx.id.as_str()));

        let block = Block::new(
            job.index,
            job.transactions,
            proof.nonce,
            job.previous_hash,
            proof.hash,
        );
        info!(
            "Mined block {} with {} transactions (nonce {})",
            block.index,
            block.transactions.len(),
            block.nonce
        );
        self.chain.push(block.clone());

        Ok(block)
    }

    /// Appends a block mined by a peer if it extends the current tip
    ///
    /// Only linkage and index are checked. A rejected block leaves the ledger untouched.
    pub fn accept_external_block(&mut self, block: Block) -> bool {
        let last = self.last_block();
        let correct_hash = block.previous_hash == last.hash;
        let correct_index = block.index == last.index + 1;

        if !(correct_hash && correct_index) {
            warn!(
                "Rejected block {} (expected index {} on top of {})",
                block.index,
                last.index + 1,
                last.hash
            );
            return false;
        }

        info!("Accepted block {} from peer", block.index);
        self.chain.push(block);
        self.pending.clear();
        true
    }

    /// Validates a candidate chain
    ///
    /// The genesis block must have its fixed shape and every later block must
    /// follow its predecessor's index, link to its hash and carry a proof of
    /// work over its content.
    pub fn is_valid(chain: &[Block]) -> bool {
        let Some(genesis) = chain.first() else {
            return false;
        };
        if !genesis.is_valid_genesis() {
            return false;
        }

        chain.windows(2).all(|pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            previous.index.checked_add(1) == Some(current.index)
                && current.previous_hash == previous.hash
                && pow::verify(&previous.hash, &current.content(), current.nonce)
        })
    }

    /// Replaces chain and pending pool with a peer's copy if the chain is valid
    pub fn try_replace(&mut self, snapshot: ChainSnapshot) -> bool {
        if !Self::is_valid(&snapshot.chain) {
            return false;
        }

        self.chain = snapshot.chain;
        self.pending = snapshot.pending;
        true
    }

    /// Finds a block by its hash
    pub fn lookup_block(&self, hash: &str) -> Option<&Block> {
        self.chain.iter().find(|block| block.hash == hash)
    }

    /// Finds a confirmed transaction and the block containing it
    pub fn lookup_transaction(&self, id: &str) -> Option<(&Block, &Transaction)> {
        self.chain
            .iter()
            .find_map(|block| block.find_transaction(id).map(|tx| (block, tx)))
    }

    pub fn address_summary(&self, address: &Address) -> AddressSummary {
        AddressSummary::from_chain(&self.chain, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::GENESIS_SENTINEL;
    use crate::blockchain::testing::ledger_with_blocks;

    fn transfer(amount: f64, from: &str, to: &str) -> Transaction {
        Transaction::new(amount, Address::from(from), Address::from(to))
    }

    #[test]
    fn test_new_blockchain() {
        let blockchain = Blockchain::new();
        let chain = blockchain.chain();

        assert_eq!(chain.len(), 1);
        assert!(chain[0].is_valid_genesis());
        assert_eq!(chain[0].hash, GENESIS_SENTINEL);
        assert!(blockchain.pending().is_empty());
        assert!(Blockchain::is_valid(chain));
    }

    #[test]
    fn test_create_transaction_does_not_mutate() {
        let blockchain = Blockchain::new();
        let tx = blockchain.create_transaction(5.0, "a".into(), "b".into());

        assert_eq!(tx.amount, 5.0);
        assert!(blockchain.pending().is_empty());
    }

    #[test]
    fn test_add_transaction() {
        let mut blockchain = Blockchain::new();

        let block_index = blockchain.add_to_pending(transfer(10.0, "a", "b"));
        assert_eq!(block_index, 2);
        assert_eq!(blockchain.pending().len(), 1);
    }

    #[test]
    fn test_mine_block() {
        let mut blockchain = Blockchain::new();
        let tx = transfer(10.0, "a", "b");
        blockchain.add_to_pending(tx.clone());
        let previous = blockchain.last_block().clone();

        let block = blockchain.mine().unwrap();

        assert_eq!(block.index, previous.index + 1);
        assert_eq!(block.previous_hash, previous.hash);
        assert_eq!(block.transactions, vec![tx]);
        assert!(pow::meets_difficulty(&block.hash));
        assert!(blockchain.pending().is_empty());
        assert_eq!(blockchain.last_block(), &block);
        assert!(Blockchain::is_valid(blockchain.chain()));
    }

    #[test]
    fn test_append_keeps_transactions_submitted_during_search() {
        let mut blockchain = Blockchain::new();
        blockchain.add_to_pending(transfer(1.0, "a", "b"));
        let job = blockchain.mining_job();
        let late = transfer(2.0, "c", "d");
        blockchain.add_to_pending(late.clone());

        let proof = pow::proof_of_work(&job.previous_hash, &job.content()).unwrap();
        let block = blockchain.append_mined(job, proof).unwrap();

        assert_eq!(block.transactions.len(), 1);
        assert_eq!(blockchain.pending(), &[late]);
    }

    #[test]
    fn test_append_rejects_stale_job() {
        let mut blockchain = Blockchain::new();
        let job = blockchain.mining_job();
        let proof = pow::proof_of_work(&job.previous_hash, &job.content()).unwrap();
        blockchain.mine().unwrap();

        let result = blockchain.append_mined(job, proof);
        assert!(matches!(result, Err(BlockchainError::Stale { .. })));
        assert_eq!(blockchain.len(), 2);
    }

    #[test]
    fn test_accept_external_block() {
        let mut source = Blockchain::new();
        source.add_to_pending(transfer(1.0, "a", "b"));
        let block = source.mine().unwrap();

        let mut blockchain = Blockchain::new();
        blockchain.add_to_pending(transfer(9.0, "x", "y"));

        assert!(blockchain.accept_external_block(block.clone()));
        assert_eq!(blockchain.last_block(), &block);
        assert!(blockchain.pending().is_empty());
    }

    #[test]
    fn test_reject_external_block() {
        let mut source = Blockchain::new();
        let block = source.mine().unwrap();
        let mut blockchain = Blockchain::new();
        blockchain.add_to_pending(transfer(9.0, "x", "y"));

        let mut wrong_hash = block.clone();
        wrong_hash.previous_hash = "not-the-tip".to_string();
        assert!(!blockchain.accept_external_block(wrong_hash));

        let mut wrong_index = block;
        wrong_index.index = 7;
        assert!(!blockchain.accept_external_block(wrong_index));

        assert_eq!(blockchain.len(), 1);
        assert_eq!(blockchain.pending().len(), 1);
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        assert!(!Blockchain::is_valid(&[]));
    }

    #[test]
    fn test_bad_genesis_is_invalid() {
        let mut chain = vec![Block::genesis()];
        chain[0].hash = "1".to_string();
        assert!(!Blockchain::is_valid(&chain));

        let mut chain = ledger_with_blocks(3).chain().to_vec();
        chain[0].previous_hash = "x".to_string();
        assert!(!Blockchain::is_valid(&chain));
    }

    #[test]
    fn test_blockchain_validity_rejects_tampering() {
        let chain = ledger_with_blocks(3).chain().to_vec();
        assert!(Blockchain::is_valid(&chain));

        let mut tampered = chain.clone();
        tampered[1].transactions[0].amount += 1.0;
        assert!(!Blockchain::is_valid(&tampered));

        let mut tampered = chain.clone();
        let nonce = tampered[2].nonce;
        tampered[2].nonce = if nonce > 0 { nonce - 1 } else { nonce + 1 };
        assert!(!Blockchain::is_valid(&tampered));

        let mut tampered = chain.clone();
        tampered[2].previous_hash = "forged".to_string();
        assert!(!Blockchain::is_valid(&tampered));

        let mut tampered = chain;
        tampered[1].transactions.clear();
        assert!(!Blockchain::is_valid(&tampered));
    }

    #[test]
    fn test_index_gap_is_invalid() {
        let genesis = Block::genesis();
        let content = BlockContent {
            index: u64::MAX,
            transactions: &[],
        };
        let proof = pow::proof_of_work(&genesis.hash, &content).unwrap();
        let jump = Block::new(u64::MAX, Vec::new(), proof.nonce, genesis.hash.clone(), proof.hash);
        let chain = vec![genesis, jump];

        assert!(!Blockchain::is_valid(&chain));

        let mut blockchain = Blockchain::new();
        assert!(!blockchain.try_replace(ChainSnapshot {
            chain,
            pending: Vec::new(),
        }));
        assert_eq!(blockchain.add_to_pending(transfer(1.0, "a", "b")), 2);
    }

    #[test]
    fn test_chain_survives_json_transfer() {
        // 3.7717863983230044 is one of the amounts that only parse back exactly
        // with a correctly rounded float parser.
        let mut ledger = ledger_with_blocks(2);
        for amount in [3.7717863983230044, 0.1 + 0.2, 1e-7 / 3.0, 12345.678901234567] {
            ledger.add_to_pending(transfer(amount, "a", "b"));
        }
        ledger.mine().unwrap();
        let snapshot = ledger.snapshot();
        assert!(Blockchain::is_valid(&snapshot.chain));

        let text = serde_json::to_string(&snapshot).unwrap();
        let received: ChainSnapshot = serde_json::from_str(&text).unwrap();

        assert_eq!(received, snapshot);
        assert!(Blockchain::is_valid(&received.chain));

        let mut peer = Blockchain::new();
        assert!(peer.try_replace(received));
        assert_eq!(peer.len(), 3);
    }

    #[test]
    fn test_try_replace() {
        let mut blockchain = Blockchain::new();
        let mut longer = ledger_with_blocks(4);
        longer.add_to_pending(transfer(1.0, "p", "q"));
        let snapshot = longer.snapshot();

        let mut invalid = snapshot.clone();
        invalid.chain[2].previous_hash = "forged".to_string();
        assert!(!blockchain.try_replace(invalid));
        assert_eq!(blockchain.len(), 1);

        assert!(blockchain.try_replace(snapshot.clone()));
        assert_eq!(blockchain.snapshot(), snapshot);
    }

    #[test]
    fn test_lookup_block() {
        let blockchain = ledger_with_blocks(3);
        let wanted = blockchain.chain()[1].clone();

        assert_eq!(blockchain.lookup_block(&wanted.hash), Some(&wanted));
        assert_eq!(blockchain.lookup_block("no-such-digest"), None);
    }

    #[test]
    fn test_lookup_transaction() {
        let mut blockchain = ledger_with_blocks(2);
        let tx = transfer(4.0, "a", "b");
        blockchain.add_to_pending(tx.clone());
        let block = blockchain.mine().unwrap();
        blockchain.mine().unwrap();

        let (found_block, found_tx) = blockchain.lookup_transaction(&tx.id).unwrap();
        assert_eq!(found_block, &block);
        assert_eq!(found_tx, &tx);
        assert!(blockchain.lookup_transaction("unknown").is_none());
    }

    #[test]
    fn test_pending_transactions_are_not_confirmed() {
        let mut blockchain = Blockchain::new();
        let tx = transfer(4.0, "a", "b");
        blockchain.add_to_pending(tx.clone());

        assert!(blockchain.lookup_transaction(&tx.id).is_none());
        assert!(blockchain.address_summary(&"a".into()).transactions.is_empty());
    }

    #[test]
    fn test_address_summary() {
        let mut blockchain = Blockchain::new();
        blockchain.add_to_pending(transfer(10.0, "A", "B"));
        blockchain.mine().unwrap();
        blockchain.add_to_pending(transfer(3.0, "B", "A"));
        blockchain.mine().unwrap();

        let summary = blockchain.address_summary(&"A".into());
        assert_eq!(summary.balance, -7.0);
        assert_eq!(summary.transactions.len(), 2);
        assert_eq!(blockchain.address_summary(&"B".into()).balance, 7.0);
    }
}
