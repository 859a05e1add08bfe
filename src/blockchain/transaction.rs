use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::crypto::{unique_id, Address};

/// Reserved sender of mining reward transactions
pub const REWARD_SENDER: &str = "00";

/// Amount paid to a node for every block it mines
pub const MINING_REWARD: f64 = 12.5;

/// Errors raised when a submitted transaction is malformed
#[derive(Debug, Error, PartialEq)]
pub enum TransactionError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Missing sender address")]
    MissingSender,

    #[error("Missing recipient address")]
    MissingRecipient,

    #[error("Missing transaction id")]
    MissingId,
}

/// Represents a value transfer between two addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Unique identifier for the transaction
    pub id: String,

    /// Sender's address
    pub sender: Address,

    /// Recipient's address
    pub recipient: Address,

    /// Amount being transferred
    pub amount: f64,
}

impl Transaction {
    /// Creates a new transaction with a fresh identifier
    ///
    /// # Arguments
    ///
    /// * `amount` - The amount to transfer
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    pub fn new(amount: f64, sender: Address, recipient: Address) -> Self {
        Transaction {
            id: unique_id(),
            sender,
            recipient,
            amount,
        }
    }

    /// Creates a mining reward paid to `recipient`
    pub fn new_reward(recipient: Address) -> Self {
        Self::new(MINING_REWARD, Address::from(REWARD_SENDER), recipient)
    }

    /// Checks if `address` is the sender or the recipient
    pub fn touches(&self, address: &Address) -> bool {
        &self.sender == address || &self.recipient == address
    }

    /// Checks the shape of a transaction received over the wire
    ///
    /// Only structure is checked. Balances and signatures are not.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.id.trim().is_empty() {
            return Err(TransactionError::MissingId);
        }
        validate_transfer(self.amount, &self.sender, &self.recipient)
    }
}

/// Checks the fields of a transfer request before a transaction is created
pub fn validate_transfer(
    amount: f64,
    sender: &Address,
    recipient: &Address,
) -> Result<(), TransactionError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(TransactionError::InvalidAmount(amount));
    }
    if sender.is_empty() {
        return Err(TransactionError::MissingSender);
    }
    if recipient.is_empty() {
        return Err(TransactionError::MissingRecipient);
    }
    Ok(())
}
