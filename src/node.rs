use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{
    Address, AddressSummary, Block, Blockchain, BlockchainError, ChainSnapshot, Transaction,
};
use crate::network::broadcast::{broadcast_block, broadcast_transaction, introduce_node};
use crate::network::consensus::{collect_snapshots, resolve};
use crate::network::peers::normalize_url;
use crate::network::{
    BroadcastReport, ConsensusOutcome, JoinReport, PeerClient, PeerError, PeerFailure,
    PeerRegistry,
};

/// Errors that can occur while serving a node operation
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error("A block is already being mined")]
    MiningInProgress,

    #[error("Mining worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Peer(#[from] PeerError),
}

/// Result of mining a block and announcing it
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub block: Block,
    pub broadcast: BroadcastReport,
    pub reward: Transaction,
    pub reward_broadcast: BroadcastReport,
}

/// Result of one consensus round
#[derive(Debug, Clone)]
pub struct ConsensusReport {
    pub outcome: ConsensusOutcome,
    pub chain: Vec<Block>,
    pub failed: Vec<PeerFailure>,
}

/// State of a single ledger node, shared by every request handler
///
/// Ledger and registry sit behind their own mutexes, which are never held
/// across a peer call or the proof-of-work search.
pub struct NodeState {
    ledger: Mutex<Blockchain>,
    registry: Mutex<PeerRegistry>,
    client: Arc<dyn PeerClient>,
    node_address: Address,
    mining: Mutex<Option<CancellationToken>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a mining job as running; cancels it and frees the slot when dropped
struct MiningGuard<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
    token: CancellationToken,
}

impl Drop for MiningGuard<'_> {
    fn drop(&mut self) {
        self.token.cancel();
        *lock(self.slot) = None;
    }
}

impl NodeState {
    /// Creates a node reachable at `self_url` with a fresh ledger and reward address
    pub fn new(self_url: &str, client: Arc<dyn PeerClient>) -> Self {
        NodeState {
            ledger: Mutex::new(Blockchain::new()),
            registry: Mutex::new(PeerRegistry::new(self_url)),
            client,
            node_address: Address::generate(),
            mining: Mutex::new(None),
        }
    }

    /// Address that receives this node's mining rewards
    pub fn node_address(&self) -> &Address {
        &self.node_address
    }

    pub fn self_url(&self) -> String {
        lock(&self.registry).self_url().to_string()
    }

    pub fn peers(&self) -> Vec<String> {
        lock(&self.registry).peers().to_vec()
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        lock(&self.ledger).snapshot()
    }

    /// Adds a transaction received from elsewhere to the pending pool
    pub fn submit_transaction(&self, transaction: Transaction) -> u64 {
        lock(&self.ledger).add_to_pending(transaction)
    }

    /// Creates a transaction, adds it locally and sends it to every peer
    pub async fn create_and_broadcast(
        &self,
        amount: f64,
        sender: Address,
        recipient: Address,
    ) -> (Transaction, BroadcastReport) {
        let transaction = {
            let mut ledger = lock(&self.ledger);
            let transaction = ledger.create_transaction(amount, sender, recipient);
            ledger.add_to_pending(transaction.clone());
            transaction
        };

        let peers = self.peers();
        let report = broadcast_transaction(self.client.as_ref(), &peers, &transaction).await;
        (transaction, report)
    }

    fn begin_mining(&self) -> Result<MiningGuard<'_>, NodeError> {
        let mut slot = lock(&self.mining);
        if slot.is_some() {
            return Err(NodeError::MiningInProgress);
        }

        let token = CancellationToken::new();
        *slot = Some(token.clone());
        Ok(MiningGuard {
            slot: &self.mining,
            token,
        })
    }

    /// Stops the running proof-of-work search, if any
    fn cancel_mining(&self) {
        if let Some(token) = lock(&self.mining).as_ref() {
            info!("Cancelling mining job built on a stale tip");
            token.cancel();
        }
    }

    /// Mines the pending pool into a block on a blocking worker and appends it
    async fn mine_block(&self) -> Result<Block, NodeError> {
        let guard = self.begin_mining()?;
        let job = lock(&self.ledger).mining_job();
        let cancel = guard.token.clone();

        info!("Mining block {} with {} transactions", job.index, job.transactions.len());
        let (job, proof) = tokio::task::spawn_blocking(move || {
            let proof = job.solve(&cancel);
            (job, proof)
        })
        .await
        .map_err(|e| NodeError::Worker(e.to_string()))?;

        let proof = proof.map_err(BlockchainError::from)?;
        let block = lock(&self.ledger).append_mined(job, proof)?;
        drop(guard);

        Ok(block)
    }

    /// Mines a block, announces it, then issues this node's reward
    ///
    /// The reward joins the local pool as soon as the block is appended and
    /// lands in the next block. Both broadcasts run on a detached task, so the
    /// reward still follows its block when the caller goes away.
    pub async fn mine(&self) -> Result<MinedBlock, NodeError> {
        let block = self.mine_block().await?;
        let reward = Transaction::new_reward(self.node_address.clone());
        lock(&self.ledger).add_to_pending(reward.clone());
        info!("Issued reward {} to {}", reward.id, self.node_address);

        let client = Arc::clone(&self.client);
        let peers = self.peers();
        let announcement = {
            let block = block.clone();
            let reward = reward.clone();
            tokio::spawn(async move {
                let broadcast = broadcast_block(client.as_ref(), &peers, &block).await;
                let reward_broadcast =
                    broadcast_transaction(client.as_ref(), &peers, &reward).await;
                (broadcast, reward_broadcast)
            })
        };
        let (broadcast, reward_broadcast) = announcement
            .await
            .map_err(|e| NodeError::Worker(e.to_string()))?;

        Ok(MinedBlock {
            block,
            broadcast,
            reward,
            reward_broadcast,
        })
    }

    /// Appends a block mined by a peer if it extends the local tip
    pub fn receive_block(&self, block: Block) -> bool {
        let accepted = lock(&self.ledger).accept_external_block(block);
        if accepted {
            self.cancel_mining();
        }
        accepted
    }

    /// Registers a single peer without telling anyone
    pub fn register_peer(&self, url: &str) -> bool {
        lock(&self.registry).register(url)
    }

    /// Registers every URL in `urls`; returns how many were new
    pub fn register_peers_bulk(&self, urls: &[String]) -> usize {
        lock(&self.registry).register_all(urls)
    }

    /// Registers a joining node and introduces it to the rest of the network
    pub async fn register_and_broadcast(&self, url: &str) -> JoinReport {
        let new_url = normalize_url(url);
        let (known, view) = {
            let mut registry = lock(&self.registry);
            registry.register(&new_url);
            let known: Vec<String> = registry
                .peers()
                .iter()
                .filter(|peer| **peer != new_url)
                .cloned()
                .collect();
            (known, registry.network_view())
        };

        introduce_node(self.client.as_ref(), &known, &view, &new_url).await
    }

    /// Runs the longest-valid-chain rule against every registered peer
    pub async fn run_consensus(&self) -> ConsensusReport {
        let peers = self.peers();
        let (snapshots, failed) = collect_snapshots(self.client.as_ref(), &peers).await;

        let (outcome, chain) = {
            let mut ledger = lock(&self.ledger);
            let outcome = resolve(&mut ledger, snapshots);
            (outcome, ledger.chain().to_vec())
        };
        if outcome.replaced() {
            self.cancel_mining();
        }

        ConsensusReport {
            outcome,
            chain,
            failed,
        }
    }

    /// Asks `bootstrap` to bring this node into its network
    pub async fn join_network(&self, bootstrap: &str) -> Result<(), NodeError> {
        let self_url = self.self_url();
        info!("Joining network through {}", bootstrap);
        self.client.join(&normalize_url(bootstrap), &self_url).await?;
        Ok(())
    }

    pub fn lookup_block(&self, hash: &str) -> Option<Block> {
        lock(&self.ledger).lookup_block(hash).cloned()
    }

    pub fn lookup_transaction(&self, id: &str) -> Option<(Block, Transaction)> {
        lock(&self.ledger)
            .lookup_transaction(id)
            .map(|(block, tx)| (block.clone(), tx.clone()))
    }

    pub fn address_summary(&self, address: &Address) -> AddressSummary {
        lock(&self.ledger).address_summary(address)
    }
}
