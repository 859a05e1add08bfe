use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use log::warn;
use thiserror::Error;

use super::schema::ErrorResponse;
use crate::blockchain::pow::PowError;
use crate::blockchain::{BlockchainError, TransactionError};
use crate::node::NodeError;

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Node(#[from] NodeError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Transaction(_) => StatusCode::BAD_REQUEST,
            ApiError::Node(err) => match err {
                NodeError::MiningInProgress
                | NodeError::Blockchain(BlockchainError::Stale { .. })
                | NodeError::Blockchain(BlockchainError::ProofOfWork(PowError::Cancelled)) => {
                    StatusCode::CONFLICT
                }
                NodeError::Peer(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

/// Turns unreadable JSON bodies into a 400 with the usual error body
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Malformed request to {}: {}", req.path(), err);
    ApiError::BadRequest(err.to_string()).into()
}
