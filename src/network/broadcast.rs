use std::future::Future;

use futures::future::join_all;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::client::{PeerClient, PeerError};
use crate::blockchain::{Block, Transaction};

/// A peer call that did not complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PeerFailure {
    pub peer: String,
    pub error: String,
}

/// Per-peer outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BroadcastReport {
    /// Peers that took the message
    pub delivered: Vec<String>,

    /// Peers that answered but refused the message (blocks only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,

    /// Peers that could not be reached or answered with an error
    pub failed: Vec<PeerFailure>,
}

impl BroadcastReport {
    /// True when every peer took the message
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty()
    }

    fn record(&mut self, peer: String, outcome: Result<bool, PeerError>) {
        match outcome {
            Ok(true) => self.delivered.push(peer),
            Ok(false) => self.rejected.push(peer),
            Err(err) => {
                warn!("Peer {} failed: {}", peer, err);
                self.failed.push(PeerFailure {
                    peer,
                    error: err.to_string(),
                });
            }
        }
    }
}

/// Outcome of introducing a new node to the network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinReport {
    /// Register-announcements sent to every already known peer
    pub announcements: BroadcastReport,

    /// The peer list handed to the new node
    pub bulk_registration: BroadcastReport,
}

/// Calls every peer concurrently and waits for all of them to settle
///
/// A failing peer never cuts the others short.
async fn fan_out<F, Fut>(peers: &[String], call: F) -> BroadcastReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool, PeerError>>,
{
    let calls = peers.iter().map(|peer| {
        let outcome = call(peer.clone());
        let peer = peer.clone();
        async move { (peer, outcome.await) }
    });

    let mut report = BroadcastReport::default();
    for (peer, outcome) in join_all(calls).await {
        report.record(peer, outcome);
    }
    report
}

pub async fn broadcast_transaction(
    client: &dyn PeerClient,
    peers: &[String],
    transaction: &Transaction,
) -> BroadcastReport {
    let report = fan_out(peers, |peer| async move {
        client.send_transaction(&peer, transaction).await.map(|_| true)
    })
    .await;

    info!(
        "Transaction {} reached {}/{} peers",
        transaction.id,
        report.delivered.len(),
        peers.len()
    );
    report
}

pub async fn broadcast_block(client: &dyn PeerClient, peers: &[String], block: &Block) -> BroadcastReport {
    let report = fan_out(peers, |peer| async move { client.send_block(&peer, block).await }).await;

    info!(
        "Block {} accepted by {}/{} peers",
        block.index,
        report.delivered.len(),
        peers.len()
    );
    report
}

/// Tells every peer in `peers` to register `new_url`
pub async fn announce_registration(
    client: &dyn PeerClient,
    peers: &[String],
    new_url: &str,
) -> BroadcastReport {
    fan_out(peers, |peer| async move {
        client.register_node(&peer, new_url).await.map(|_| true)
    })
    .await
}

/// Runs the bootstrap side of the join protocol
///
/// Announces `new_url` to `known_peers`, then, once every announcement has
/// settled, sends `network_view` to the new node.
pub async fn introduce_node(
    client: &dyn PeerClient,
    known_peers: &[String],
    network_view: &[String],
    new_url: &str,
) -> JoinReport {
    let announcements = announce_registration(client, known_peers, new_url).await;

    let bulk_registration = fan_out(&[new_url.to_string()], |peer| async move {
        client
            .register_nodes_bulk(&peer, network_view)
            .await
            .map(|_| true)
    })
    .await;

    info!(
        "Introduced {} to {} peers",
        new_url,
        announcements.delivered.len()
    );
    JoinReport {
        announcements,
        bulk_registration,
    }
}
