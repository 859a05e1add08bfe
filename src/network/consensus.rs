use futures::future::join_all;
use log::{info, warn};

use super::broadcast::PeerFailure;
use super::client::PeerClient;
use crate::blockchain::{Blockchain, ChainSnapshot};

/// A ledger copy fetched from one peer
#[derive(Debug, Clone)]
pub struct PeerSnapshot {
    pub peer: String,
    pub snapshot: ChainSnapshot,
}

/// What a consensus round did to the local ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusOutcome {
    /// The local ledger was replaced by `source`'s copy
    Replaced { source: String, length: usize },

    /// No peer offered a chain longer than the local one
    NoLongerChain,

    /// The longest chain offered, by `source`, failed validation
    InvalidCandidate { source: String, length: usize },
}

impl ConsensusOutcome {
    pub fn replaced(&self) -> bool {
        matches!(self, ConsensusOutcome::Replaced { .. })
    }
}

/// Fetches every peer's ledger concurrently
///
/// Peers that cannot be reached are reported separately and take no further
/// part in the round.
pub async fn collect_snapshots(
    client: &dyn PeerClient,
    peers: &[String],
) -> (Vec<PeerSnapshot>, Vec<PeerFailure>) {
    let fetches = peers.iter().map(|peer| async move {
        let result = client.fetch_snapshot(peer).await;
        (peer.clone(), result)
    });

    let mut snapshots = Vec::new();
    let mut failures = Vec::new();
    for (peer, result) in join_all(fetches).await {
        match result {
            Ok(snapshot) => snapshots.push(PeerSnapshot { peer, snapshot }),
            Err(err) => {
                warn!("Skipping {} in consensus: {}", peer, err);
                failures.push(PeerFailure {
                    peer,
                    error: err.to_string(),
                });
            }
        }
    }

    (snapshots, failures)
}

/// Picks the longest candidate strictly longer than `local_length`
///
/// Ties go to the local chain, and between equally long candidates to the
/// first one seen.
pub fn select_longest(local_length: usize, candidates: Vec<PeerSnapshot>) -> Option<PeerSnapshot> {
    let mut max_length = local_length;
    let mut longest = None;

    for candidate in candidates {
        if candidate.snapshot.chain.len() > max_length {
            max_length = candidate.snapshot.chain.len();
            longest = Some(candidate);
        }
    }

    longest
}

/// Applies the longest-valid-chain rule to `ledger`
///
/// Only the longest candidate is validated; if it is invalid the ledger stays
/// as it is even when a shorter valid candidate exists.
pub fn resolve(ledger: &mut Blockchain, candidates: Vec<PeerSnapshot>) -> ConsensusOutcome {
    let Some(longest) = select_longest(ledger.len(), candidates) else {
        info!("Local chain of length {} is the longest", ledger.len());
        return ConsensusOutcome::NoLongerChain;
    };

    let source = longest.peer;
    let length = longest.snapshot.chain.len();
    if ledger.try_replace(longest.snapshot) {
        info!("Replaced local chain with {} blocks from {}", length, source);
        ConsensusOutcome::Replaced { source, length }
    } else {
        warn!("Chain of {} blocks from {} is invalid", length, source);
        ConsensusOutcome::InvalidCandidate { source, length }
    }
}
