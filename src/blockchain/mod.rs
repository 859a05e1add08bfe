// Blockchain module
//
// This module contains the ledger engine:
// - Hashing utility and addresses
// - Transaction and block structures
// - Proof of work algorithm
// - The chain with its pending pool and validation
// - Address summaries

pub mod account;
pub mod block;
pub mod chain;
pub mod crypto;
pub mod pow;
pub mod transaction;

#[cfg(test)]
pub mod testing;

// Re-export main components for easier access
pub use account::AddressSummary;
pub use block::Block;
pub use chain::{Blockchain, BlockchainError, ChainSnapshot};
pub use crypto::Address;
pub use transaction::{Transaction, TransactionError};
