use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::transaction::Transaction;

/// Hash and previous hash of the genesis block
pub const GENESIS_SENTINEL: &str = "0";

/// Index of the genesis block
pub const GENESIS_INDEX: u64 = 1;

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Index of the block in the chain, starting at 1 for genesis
    pub index: u64,

    /// Timestamp when the block was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub timestamp: DateTime<Utc>,

    /// List of transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Proof of work
    pub nonce: u64,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Proof-of-work digest of this block
    pub hash: String,
}

/// The part of a block the proof-of-work digest commits to
///
/// Field order is part of the digest: `index` serializes before `transactions`.
#[derive(Debug, Serialize)]
pub struct BlockContent<'a> {
    pub index: u64,
    pub transactions: &'a [Transaction],
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The transactions included in the block
    /// * `nonce` - The proof of work
    /// * `previous_hash` - The hash of the previous block
    /// * `hash` - The proof-of-work digest of this block
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        nonce: u64,
        previous_hash: String,
        hash: String,
    ) -> Self {
        Block {
            index,
            timestamp: Utc::now(),
            transactions,
            nonce,
            previous_hash,
            hash,
        }
    }

    /// Creates the genesis block
    pub fn genesis() -> Self {
        Self::new(
            GENESIS_INDEX,
            Vec::new(),
            0,
            GENESIS_SENTINEL.to_string(),
            GENESIS_SENTINEL.to_string(),
        )
    }

    /// Checks the fixed shape every chain must start with
    pub fn is_valid_genesis(&self) -> bool {
        self.nonce == 0
            && self.previous_hash == GENESIS_SENTINEL
            && self.hash == GENESIS_SENTINEL
            && self.transactions.is_empty()
    }

    pub fn content(&self) -> BlockContent<'_> {
        BlockContent {
            index: self.index,
            transactions: &self.transactions,
        }
    }

    /// Finds a transaction in this block by id
    pub fn find_transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }
}
