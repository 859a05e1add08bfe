// API module
//
// This module contains the HTTP binding of the node: routes, handlers,
// wire payloads and error mapping

pub mod error;
pub mod handlers;
pub mod routes;
pub mod schema;

// Re-export main components for easier access
pub use routes::configure_routes;
