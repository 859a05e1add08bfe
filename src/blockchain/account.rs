use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::block::Block;
use super::crypto::Address;
use super::transaction::Transaction;

/// Transactions touching an address and the resulting balance
///
/// Computed by scanning the whole chain; no running balance is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddressSummary {
    /// Confirmed transactions where the address is sender or recipient, in chain order
    pub transactions: Vec<Transaction>,

    /// Amount received minus amount sent
    pub balance: f64,
}

impl AddressSummary {
    /// Builds the summary for `address` from confirmed blocks
    pub fn from_chain(chain: &[Block], address: &Address) -> Self {
        let transactions: Vec<Transaction> = chain
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter(|tx| tx.touches(address))
            .cloned()
            .collect();

        let balance = transactions.iter().fold(0.0, |balance, tx| {
            if &tx.recipient == address {
                balance + tx.amount
            } else {
                balance - tx.amount
            }
        });

        AddressSummary {
            transactions,
            balance,
        }
    }
}
