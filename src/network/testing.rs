use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;

use super::client::{PeerClient, PeerError};
use crate::blockchain::{Block, Blockchain, ChainSnapshot, Transaction};

/// A call recorded by [`FakePeers`]
#[derive(Debug, Clone, PartialEq)]
pub enum PeerCall {
    FetchSnapshot(String),
    Transaction { peer: String, id: String },
    Block { peer: String, index: u64 },
    Register { peer: String, url: String },
    Bulk { peer: String, urls: Vec<String> },
    Join { bootstrap: String, url: String },
}

/// Sends `value` through JSON text the way a peer would receive it
pub fn over_the_wire<T: Serialize + DeserializeOwned>(value: &T) -> T {
    let text = serde_json::to_string(value).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// In-memory peer set: serves canned snapshots and records every call
///
/// Snapshots are kept as JSON text, so what a node fetches has been through
/// the same encoding as a real response.
#[derive(Default)]
pub struct FakePeers {
    snapshots: Mutex<HashMap<String, String>>,
    unreachable: Mutex<HashSet<String>>,
    rejects_blocks: Mutex<HashSet<String>>,
    block_gate: Mutex<Option<Arc<Semaphore>>>,
    calls: Mutex<Vec<PeerCall>>,
}

impl FakePeers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve_snapshot(&self, peer: &str, snapshot: ChainSnapshot) {
        let text = serde_json::to_string(&snapshot).unwrap();
        self.snapshots.lock().unwrap().insert(peer.to_string(), text);
    }

    pub fn make_unreachable(&self, peer: &str) {
        self.unreachable.lock().unwrap().insert(peer.to_string());
    }

    pub fn reject_blocks(&self, peer: &str) {
        self.rejects_blocks.lock().unwrap().insert(peer.to_string());
    }

    /// Makes block deliveries wait until the returned gate gets permits
    pub fn hold_blocks(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.block_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<PeerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, peer: &str, call: PeerCall) -> Result<(), PeerError> {
        self.calls.lock().unwrap().push(call);
        if self.unreachable.lock().unwrap().contains(peer) {
            return Err(PeerError::Unreachable {
                peer: peer.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PeerClient for FakePeers {
    async fn fetch_snapshot(&self, peer: &str) -> Result<ChainSnapshot, PeerError> {
        self.record(peer, PeerCall::FetchSnapshot(peer.to_string()))?;
        let text = self.snapshots.lock().unwrap().get(peer).cloned();
        match text {
            Some(text) => serde_json::from_str(&text).map_err(|e| PeerError::Decode {
                peer: peer.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(over_the_wire(&Blockchain::new().snapshot())),
        }
    }

    async fn send_transaction(&self, peer: &str, transaction: &Transaction) -> Result<(), PeerError> {
        self.record(
            peer,
            PeerCall::Transaction {
                peer: peer.to_string(),
                id: transaction.id.clone(),
            },
        )
    }

    async fn send_block(&self, peer: &str, block: &Block) -> Result<bool, PeerError> {
        self.record(
            peer,
            PeerCall::Block {
                peer: peer.to_string(),
                index: block.index,
            },
        )?;
        let gate = self.block_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
        Ok(!self.rejects_blocks.lock().unwrap().contains(peer))
    }

    async fn register_node(&self, peer: &str, url: &str) -> Result<(), PeerError> {
        self.record(
            peer,
            PeerCall::Register {
                peer: peer.to_string(),
                url: url.to_string(),
            },
        )
    }

    async fn register_nodes_bulk(&self, peer: &str, urls: &[String]) -> Result<(), PeerError> {
        self.record(
            peer,
            PeerCall::Bulk {
                peer: peer.to_string(),
                urls: urls.to_vec(),
            },
        )
    }

    async fn join(&self, bootstrap: &str, url: &str) -> Result<(), PeerError> {
        self.record(
            bootstrap,
            PeerCall::Join {
                bootstrap: bootstrap.to_string(),
                url: url.to_string(),
            },
        )
    }
}
