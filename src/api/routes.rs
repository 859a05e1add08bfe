use actix_web::web;

use super::error::json_error_handler;
use super::handlers;

pub const BLOCKCHAIN: &str = "/blockchain";
pub const TRANSACTION: &str = "/transaction";
pub const TRANSACTION_BROADCAST: &str = "/transaction/broadcast";
pub const MINE: &str = "/mine";
pub const RECEIVE_BLOCK: &str = "/receive-new-block";
pub const REGISTER_AND_BROADCAST_NODE: &str = "/register-and-broadcast-node";
pub const REGISTER_NODE: &str = "/register-node";
pub const REGISTER_NODES_BULK: &str = "/register-nodes-bulk";
pub const CONSENSUS: &str = "/consensus";

/// Configures the API routes
///
/// Peers call each other on these same paths, so they are not versioned.
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route(BLOCKCHAIN, web::get().to(handlers::get_blockchain))
        .route(TRANSACTION, web::post().to(handlers::receive_transaction))
        .route(TRANSACTION_BROADCAST, web::post().to(handlers::broadcast_transaction))
        .route(MINE, web::get().to(handlers::mine))
        .route(RECEIVE_BLOCK, web::post().to(handlers::receive_block))
        .route(REGISTER_AND_BROADCAST_NODE, web::post().to(handlers::register_and_broadcast_node))
        .route(REGISTER_NODE, web::post().to(handlers::register_node))
        .route(REGISTER_NODES_BULK, web::post().to(handlers::register_nodes_bulk))
        .route(CONSENSUS, web::get().to(handlers::consensus))
        .route("/block/{hash}", web::get().to(handlers::get_block))
        .route("/transaction/{id}", web::get().to(handlers::get_transaction))
        .route("/address/{address}", web::get().to(handlers::get_address));
}
