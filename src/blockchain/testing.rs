use super::chain::Blockchain;
use super::crypto::Address;
use super::transaction::Transaction;

/// Builds a valid ledger holding `blocks` blocks, genesis included
///
/// Every mined block carries one transfer.
pub fn ledger_with_blocks(blocks: usize) -> Blockchain {
    let mut ledger = Blockchain::new();
    for i in 1..blocks {
        ledger.add_to_pending(Transaction::new(
            i as f64,
            Address::from(format!("sender-{}", i)),
            Address::from(format!("recipient-{}", i)),
        ));
        if let Err(err) = ledger.mine() {
            panic!("mining test block {} failed: {}", i, err);
        }
    }
    ledger
}
