//! A single node of a proof-of-work ledger network.
//!
//! The node keeps an append-only chain and a pending transaction pool, mines
//! blocks, and stays in line with its peers through longest-valid-chain
//! consensus over a JSON API.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod network;
pub mod node;
