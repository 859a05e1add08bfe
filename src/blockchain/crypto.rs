use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use std::fmt;

/// Represents a ledger address
///
/// Addresses are opaque strings; nothing proves that the holder of an
/// address authorized a transfer from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Generates a fresh address for this node (used as the mining reward recipient)
    pub fn generate() -> Self {
        Address(unique_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address(s)
    }
}

/// Returns a collision-resistant identifier: a random UUID as 32 lowercase hex characters
pub fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Incremental SHA-256 over a sequence of byte slices, returned as lowercase hex
///
/// Hashing the parts in order is the same as hashing their concatenation.
pub fn sha256_hex<I, T>(parts: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    hex::encode(hasher.finalize())
}
