// Network module
//
// Everything a node does with its peers:
// - The registry of known peer URLs
// - The peer transport
// - Fan-out of transactions, blocks and registrations
// - Longest-valid-chain consensus

pub mod broadcast;
pub mod client;
pub mod consensus;
pub mod peers;

#[cfg(test)]
pub mod testing;

pub use broadcast::{BroadcastReport, JoinReport, PeerFailure};
pub use client::{HttpPeerClient, PeerClient, PeerError};
pub use consensus::ConsensusOutcome;
pub use peers::PeerRegistry;
