use actix_web::{web, HttpResponse, Responder};

use super::error::ApiError;
use super::schema::{
    BlockLookupResponse, BlockRequest, BlockchainResponse, BroadcastTransactionResponse,
    BulkPeersRequest, ConsensusResponse, ErrorResponse, MineResponse, NewTransactionRequest,
    NoteResponse, PeerRequest, PendingResponse, ReceiveBlockResponse, RegisterBroadcastResponse,
    TransactionLookupResponse, TransactionRequest,
};
use crate::blockchain::transaction::validate_transfer;
use crate::blockchain::{Address, AddressSummary};
use crate::node::NodeState;

/// Data structure for the node state
pub type NodeData = web::Data<NodeState>;

fn require_url(url: &str) -> Result<(), ApiError> {
    if url.trim().is_empty() {
        return Err(ApiError::BadRequest("peerURL must not be empty".to_string()));
    }
    Ok(())
}

/// Get the full ledger
///
/// Returns the chain, the pending pool and the peers this node knows
#[utoipa::path(
    get,
    path = "/blockchain",
    responses(
        (status = 200, description = "Ledger retrieved successfully", body = BlockchainResponse)
    )
)]
pub async fn get_blockchain(node: NodeData) -> impl Responder {
    let snapshot = node.snapshot();

    HttpResponse::Ok().json(BlockchainResponse {
        chain: snapshot.chain,
        pending: snapshot.pending,
        current_node_url: node.self_url(),
        network_nodes: node.peers(),
    })
}

/// Add a transaction to the pending pool
///
/// Used by peers to hand over a broadcast transaction. Nothing is forwarded.
#[utoipa::path(
    post,
    path = "/transaction",
    request_body = NewTransactionRequest,
    responses(
        (status = 200, description = "Transaction added to the pending pool", body = PendingResponse),
        (status = 400, description = "Malformed transaction", body = ErrorResponse)
    )
)]
pub async fn receive_transaction(
    node: NodeData,
    request: web::Json<NewTransactionRequest>,
) -> Result<HttpResponse, ApiError> {
    let transaction = request.into_inner().transaction;
    transaction.validate()?;

    let next_block_index = node.submit_transaction(transaction);

    Ok(HttpResponse::Ok().json(PendingResponse {
        note: format!("Transaction will be added in block {}", next_block_index),
        next_block_index,
    }))
}

/// Create a transaction and broadcast it
///
/// Adds the new transaction locally and sends it to every peer
#[utoipa::path(
    post,
    path = "/transaction/broadcast",
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transaction created and broadcast", body = BroadcastTransactionResponse),
        (status = 400, description = "Invalid transaction data", body = ErrorResponse)
    )
)]
pub async fn broadcast_transaction(
    node: NodeData,
    request: web::Json<TransactionRequest>,
) -> Result<HttpResponse, ApiError> {
    let TransactionRequest {
        amount,
        sender,
        recipient,
    } = request.into_inner();
    validate_transfer(amount, &sender, &recipient)?;

    let (transaction, broadcast) = node.create_and_broadcast(amount, sender, recipient).await;
    let note = if broadcast.is_complete() {
        "Transaction created and broadcast successfully."
    } else {
        "Transaction created; some peers did not receive it."
    };

    Ok(HttpResponse::Ok().json(BroadcastTransactionResponse {
        note: note.to_string(),
        transaction,
        broadcast,
    }))
}

/// Mine a new block
///
/// Mines the pending pool, broadcasts the block and issues the mining reward
#[utoipa::path(
    get,
    path = "/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 409, description = "Another block is being mined, or the tip moved", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn mine(node: NodeData) -> Result<HttpResponse, ApiError> {
    let mined = node.mine().await?;
    let note = if mined.broadcast.is_complete() {
        "New block mined & broadcast successfully."
    } else {
        "New block mined; some peers did not take it."
    };

    Ok(HttpResponse::Ok().json(MineResponse {
        note: note.to_string(),
        block: mined.block,
        broadcast: mined.broadcast,
        reward: mined.reward,
        reward_broadcast: mined.reward_broadcast,
    }))
}

/// Receive a block mined by a peer
///
/// The block is appended only if it extends the local tip
#[utoipa::path(
    post,
    path = "/receive-new-block",
    request_body = BlockRequest,
    responses(
        (status = 200, description = "Block accepted or rejected", body = ReceiveBlockResponse),
        (status = 400, description = "Malformed block", body = ErrorResponse)
    )
)]
pub async fn receive_block(node: NodeData, request: web::Json<BlockRequest>) -> impl Responder {
    let block = request.into_inner().block;
    let accepted = node.receive_block(block.clone());
    let note = if accepted {
        "New block received and accepted."
    } else {
        "New block rejected."
    };

    HttpResponse::Ok().json(ReceiveBlockResponse {
        note: note.to_string(),
        accepted,
        block,
    })
}

/// Register a new node and introduce it to the network
///
/// Announces the node to every known peer, then sends it the full peer list
#[utoipa::path(
    post,
    path = "/register-and-broadcast-node",
    request_body = PeerRequest,
    responses(
        (status = 200, description = "Node registered with the network", body = RegisterBroadcastResponse),
        (status = 400, description = "Missing peer URL", body = ErrorResponse)
    )
)]
pub async fn register_and_broadcast_node(
    node: NodeData,
    request: web::Json<PeerRequest>,
) -> Result<HttpResponse, ApiError> {
    let peer_url = request.into_inner().peer_url;
    require_url(&peer_url)?;

    let report = node.register_and_broadcast(&peer_url).await;
    let complete = report.announcements.is_complete() && report.bulk_registration.is_complete();
    let note = if complete {
        "New node registered with network successfully."
    } else {
        "New node registered; some peers could not be reached."
    };

    Ok(HttpResponse::Ok().json(RegisterBroadcastResponse {
        note: note.to_string(),
        announcements: report.announcements,
        bulk_registration: report.bulk_registration,
    }))
}

/// Register a single node
///
/// Registers the node locally without telling anyone
#[utoipa::path(
    post,
    path = "/register-node",
    request_body = PeerRequest,
    responses(
        (status = 200, description = "Node registered", body = NoteResponse),
        (status = 400, description = "Missing peer URL", body = ErrorResponse)
    )
)]
pub async fn register_node(
    node: NodeData,
    request: web::Json<PeerRequest>,
) -> Result<HttpResponse, ApiError> {
    let peer_url = request.into_inner().peer_url;
    require_url(&peer_url)?;

    let note = if node.register_peer(&peer_url) {
        "New node registered successfully with node."
    } else {
        "Node was already known."
    };

    Ok(HttpResponse::Ok().json(NoteResponse {
        note: note.to_string(),
    }))
}

/// Register a list of nodes
///
/// Sent by the bootstrap node to a node that just joined
#[utoipa::path(
    post,
    path = "/register-nodes-bulk",
    request_body = BulkPeersRequest,
    responses(
        (status = 200, description = "Nodes registered", body = NoteResponse)
    )
)]
pub async fn register_nodes_bulk(
    node: NodeData,
    request: web::Json<BulkPeersRequest>,
) -> impl Responder {
    let added = node.register_peers_bulk(&request.peer_urls);

    HttpResponse::Ok().json(NoteResponse {
        note: format!("Bulk registration successful ({} new nodes).", added),
    })
}

/// Run consensus
///
/// Adopts the longest valid chain among the peers if it is longer than the local one
#[utoipa::path(
    get,
    path = "/consensus",
    responses(
        (status = 200, description = "Consensus round finished", body = ConsensusResponse)
    )
)]
pub async fn consensus(node: NodeData) -> impl Responder {
    let report = node.run_consensus().await;
    let replaced = report.outcome.replaced();
    let note = if replaced {
        "Current chain has been replaced."
    } else {
        "Current chain has NOT been replaced."
    };

    HttpResponse::Ok().json(ConsensusResponse {
        note: note.to_string(),
        replaced,
        chain: report.chain,
        failed_peers: report.failed,
    })
}

/// Look up a block by its hash
#[utoipa::path(
    get,
    path = "/block/{hash}",
    params(("hash" = String, Path, description = "Proof-of-work digest of the block")),
    responses(
        (status = 200, description = "The block, or null if unknown", body = BlockLookupResponse)
    )
)]
pub async fn get_block(node: NodeData, hash: web::Path<String>) -> impl Responder {
    HttpResponse::Ok().json(BlockLookupResponse {
        block: node.lookup_block(&hash),
    })
}

/// Look up a confirmed transaction by id
#[utoipa::path(
    get,
    path = "/transaction/{id}",
    params(("id" = String, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "The transaction and its block, or nulls if unknown", body = TransactionLookupResponse)
    )
)]
pub async fn get_transaction(node: NodeData, id: web::Path<String>) -> impl Responder {
    let (block, transaction) = match node.lookup_transaction(&id) {
        Some((block, transaction)) => (Some(block), Some(transaction)),
        None => (None, None),
    };

    HttpResponse::Ok().json(TransactionLookupResponse { block, transaction })
}

/// Get an address summary
///
/// Returns every confirmed transaction touching the address and its balance
#[utoipa::path(
    get,
    path = "/address/{address}",
    params(("address" = String, Path, description = "Address to summarize")),
    responses(
        (status = 200, description = "Address summary", body = AddressSummary)
    )
)]
pub async fn get_address(node: NodeData, address: web::Path<String>) -> impl Responder {
    let address = Address(address.into_inner());
    HttpResponse::Ok().json(node.address_summary(&address))
}
