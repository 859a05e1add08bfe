use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::block::BlockContent;
use super::crypto::sha256_hex;

/// A digest satisfies the difficulty target when it starts with this prefix
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Number of nonces tried between two cancellation checks
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Errors that can occur during the proof-of-work search
#[derive(Debug, Error)]
pub enum PowError {
    #[error("Failed to serialize block content: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Proof-of-work search was cancelled")]
    Cancelled,
}

/// A nonce together with the digest it produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub nonce: u64,
    pub hash: String,
}

/// Serializes block content the way the digest expects it
pub fn canonical_payload(content: &BlockContent<'_>) -> Result<String, PowError> {
    Ok(serde_json::to_string(content)?)
}

fn digest(previous_hash: &str, nonce: u64, payload: &str) -> String {
    let nonce = nonce.to_string();
    sha256_hex([previous_hash, nonce.as_str(), payload])
}

/// Computes the digest of `previous_hash ++ nonce ++ json(content)`
pub fn hash_block(
    previous_hash: &str,
    content: &BlockContent<'_>,
    nonce: u64,
) -> Result<String, PowError> {
    let payload = canonical_payload(content)?;
    Ok(digest(previous_hash, nonce, &payload))
}

pub fn meets_difficulty(hash: &str) -> bool {
    hash.starts_with(DIFFICULTY_PREFIX)
}

/// Recomputes the digest for a claimed nonce and checks it against the target
pub fn verify(previous_hash: &str, content: &BlockContent<'_>, nonce: u64) -> bool {
    match hash_block(previous_hash, content, nonce) {
        Ok(hash) => meets_difficulty(&hash),
        Err(_) => false,
    }
}

/// Finds the smallest nonce whose digest meets the target
///
/// Runs until a nonce is found; there is no upper bound on the work.
pub fn proof_of_work(previous_hash: &str, content: &BlockContent<'_>) -> Result<Proof, PowError> {
    search(previous_hash, content, None)
}

/// Same search as [`proof_of_work`], abandoned once `cancel` fires
pub fn proof_of_work_cancellable(
    previous_hash: &str,
    content: &BlockContent<'_>,
    cancel: &CancellationToken,
) -> Result<Proof, PowError> {
    search(previous_hash, content, Some(cancel))
}

fn search(
    previous_hash: &str,
    content: &BlockContent<'_>,
    cancel: Option<&CancellationToken>,
) -> Result<Proof, PowError> {
    // The payload does not depend on the nonce.
    let payload = canonical_payload(content)?;
    let mut nonce: u64 = 0;

    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.map_or(false, |c| c.is_cancelled()) {
            return Err(PowError::Cancelled);
        }

        let hash = digest(previous_hash, nonce, &payload);
        if meets_difficulty(&hash) {
            return Ok(Proof { nonce, hash });
        }

        nonce += 1;
    }
}
