use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Address, Block, Transaction};
use crate::network::{BroadcastReport, PeerFailure};

/// Full ledger of this node
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainResponse {
    /// The blocks in the chain, genesis first
    pub chain: Vec<Block>,

    /// Transactions waiting for the next block
    pub pending: Vec<Transaction>,

    /// URL this node is reachable at
    pub current_node_url: String,

    /// Registered peers
    pub network_nodes: Vec<String>,
}

/// Transaction handed over by a peer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewTransactionRequest {
    pub transaction: Transaction,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub note: String,

    /// Index of the block expected to include the transaction
    pub next_block_index: u64,
}

/// Transfer to create on this node and broadcast
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The amount to transfer
    pub amount: f64,

    /// The sender's address
    pub sender: Address,

    /// The recipient's address
    pub recipient: Address,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BroadcastTransactionResponse {
    pub note: String,
    pub transaction: Transaction,
    pub broadcast: BroadcastReport,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MineResponse {
    pub note: String,

    /// The newly mined block
    pub block: Block,

    /// Peers' answers to the new block
    pub broadcast: BroadcastReport,

    /// Reward issued to this node, pending until the next block
    pub reward: Transaction,

    pub reward_broadcast: BroadcastReport,
}

/// Block mined by a peer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BlockRequest {
    pub block: Block,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReceiveBlockResponse {
    pub note: String,
    pub accepted: bool,
    pub block: Block,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PeerRequest {
    #[serde(rename = "peerURL")]
    pub peer_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkPeersRequest {
    #[serde(rename = "peerURLs")]
    pub peer_urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBroadcastResponse {
    pub note: String,
    pub announcements: BroadcastReport,
    pub bulk_registration: BroadcastReport,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResponse {
    pub note: String,

    /// Whether the local chain was replaced
    pub replaced: bool,

    /// The chain after the round
    pub chain: Vec<Block>,

    /// Peers whose ledger could not be fetched
    pub failed_peers: Vec<PeerFailure>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BlockLookupResponse {
    pub block: Option<Block>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionLookupResponse {
    pub block: Option<Block>,
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
