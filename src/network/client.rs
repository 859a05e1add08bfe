use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::api::routes;
use crate::api::schema::{
    BlockRequest, BulkPeersRequest, NewTransactionRequest, NoteResponse, PeerRequest,
    PendingResponse, ReceiveBlockResponse,
};
use crate::blockchain::{Block, ChainSnapshot, Transaction};

/// Errors that can occur when talking to a peer
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to {peer} failed: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("Peer {peer} answered with HTTP {status}")]
    Status { peer: String, status: u16 },

    #[error("Peer {peer} sent an unreadable response: {reason}")]
    Decode { peer: String, reason: String },
}

/// Calls a node makes on its peers
///
/// Every call targets one peer URL and reports its own outcome.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetches the peer's chain and pending pool
    async fn fetch_snapshot(&self, peer: &str) -> Result<ChainSnapshot, PeerError>;

    /// Hands a transaction to the peer's pending pool
    async fn send_transaction(&self, peer: &str, transaction: &Transaction) -> Result<(), PeerError>;

    /// Offers a newly mined block; returns whether the peer accepted it
    async fn send_block(&self, peer: &str, block: &Block) -> Result<bool, PeerError>;

    /// Asks the peer to register `url` without propagating it
    async fn register_node(&self, peer: &str, url: &str) -> Result<(), PeerError>;

    /// Asks the peer to register every URL in `urls`
    async fn register_nodes_bulk(&self, peer: &str, urls: &[String]) -> Result<(), PeerError>;

    /// Asks `bootstrap` to register `url` and announce it to the network
    async fn join(&self, bootstrap: &str, url: &str) -> Result<(), PeerError>;
}

/// [`PeerClient`] speaking the node's own JSON API over HTTP
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// Creates a client whose requests fail after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Client(e.to_string()))?;

        Ok(HttpPeerClient { http })
    }

    async fn get<R>(&self, peer: &str, path: &str) -> Result<R, PeerError>
    where
        R: DeserializeOwned + Send,
    {
        let url = format!("{}{}", peer, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;

        read_json(peer, response).await
    }

    async fn post<B, R>(&self, peer: &str, path: &str, body: &B) -> Result<R, PeerError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}{}", peer, path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;

        read_json(peer, response).await
    }
}

fn unreachable(peer: &str, err: reqwest::Error) -> PeerError {
    PeerError::Unreachable {
        peer: peer.to_string(),
        reason: err.to_string(),
    }
}

async fn read_json<R: DeserializeOwned>(peer: &str, response: reqwest::Response) -> Result<R, PeerError> {
    let status = response.status();
    if !status.is_success() {
        return Err(PeerError::Status {
            peer: peer.to_string(),
            status: status.as_u16(),
        });
    }

    response.json::<R>().await.map_err(|e| PeerError::Decode {
        peer: peer.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_snapshot(&self, peer: &str) -> Result<ChainSnapshot, PeerError> {
        self.get(peer, routes::BLOCKCHAIN).await
    }

    async fn send_transaction(&self, peer: &str, transaction: &Transaction) -> Result<(), PeerError> {
        let body = NewTransactionRequest {
            transaction: transaction.clone(),
        };
        let _: PendingResponse = self.post(peer, routes::TRANSACTION, &body).await?;
        Ok(())
    }

    async fn send_block(&self, peer: &str, block: &Block) -> Result<bool, PeerError> {
        let body = BlockRequest {
            block: block.clone(),
        };
        let response: ReceiveBlockResponse = self.post(peer, routes::RECEIVE_BLOCK, &body).await?;
        Ok(response.accepted)
    }

    async fn register_node(&self, peer: &str, url: &str) -> Result<(), PeerError> {
        let body = PeerRequest {
            peer_url: url.to_string(),
        };
        let _: NoteResponse = self.post(peer, routes::REGISTER_NODE, &body).await?;
        Ok(())
    }

    async fn register_nodes_bulk(&self, peer: &str, urls: &[String]) -> Result<(), PeerError> {
        let body = BulkPeersRequest {
            peer_urls: urls.to_vec(),
        };
        let _: NoteResponse = self.post(peer, routes::REGISTER_NODES_BULK, &body).await?;
        Ok(())
    }

    async fn join(&self, bootstrap: &str, url: &str) -> Result<(), PeerError> {
        let body = PeerRequest {
            peer_url: url.to_string(),
        };
        let _: serde_json::Value = self
            .post(bootstrap, routes::REGISTER_AND_BROADCAST_NODE, &body)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_peer_is_reported() {
        let client = HttpPeerClient::new(Duration::from_millis(500)).unwrap();

        // Nothing listens on port 1.
        let result = client.fetch_snapshot("http://127.0.0.1:1").await;
        assert!(matches!(result, Err(PeerError::Unreachable { .. })));
    }

    #[test]
    fn test_error_messages_name_the_peer() {
        let err = PeerError::Status {
            peer: "http://b".to_string(),
            status: 500,
        };
        assert_eq!(err.to_string(), "Peer http://b answered with HTTP 500");
    }
}
