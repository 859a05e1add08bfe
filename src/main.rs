use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use log::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ledger_node::config::Args;
use ledger_node::network::HttpPeerClient;
use ledger_node::node::NodeState;
use ledger_node::{api, blockchain, network};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_blockchain,
        api::handlers::receive_transaction,
        api::handlers::broadcast_transaction,
        api::handlers::mine,
        api::handlers::receive_block,
        api::handlers::register_and_broadcast_node,
        api::handlers::register_node,
        api::handlers::register_nodes_bulk,
        api::handlers::consensus,
        api::handlers::get_block,
        api::handlers::get_transaction,
        api::handlers::get_address
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::Address,
            blockchain::AddressSummary,
            network::BroadcastReport,
            network::PeerFailure,
            api::schema::BlockchainResponse,
            api::schema::NewTransactionRequest,
            api::schema::PendingResponse,
            api::schema::TransactionRequest,
            api::schema::BroadcastTransactionResponse,
            api::schema::MineResponse,
            api::schema::BlockRequest,
            api::schema::ReceiveBlockResponse,
            api::schema::PeerRequest,
            api::schema::BulkPeersRequest,
            api::schema::NoteResponse,
            api::schema::RegisterBroadcastResponse,
            api::schema::ConsensusResponse,
            api::schema::BlockLookupResponse,
            api::schema::TransactionLookupResponse,
            api::schema::ErrorResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger node API endpoints")
    ),
    info(
        title = "Ledger Node API",
        version = "0.1.0",
        description = "A proof-of-work ledger node",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    let node_url = args.node_url();

    let client = HttpPeerClient::new(args.peer_timeout())?;
    let node = web::Data::new(NodeState::new(&node_url, Arc::new(client)));
    info!(
        "Node {} mines rewards to address {}",
        node_url,
        node.node_address()
    );

    info!("Starting HTTP server at http://{}:{}", args.host, args.port);

    let app_node = node.clone();
    let server = HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(app_node.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((args.host.as_str(), args.port))?
    .run();

    // The bootstrap node calls back into this server, so the join runs beside it.
    if let Some(bootstrap) = args.bootstrap {
        actix_web::rt::spawn(async move {
            match node.join_network(&bootstrap).await {
                Ok(()) => info!("Joined network through {}", bootstrap),
                Err(err) => warn!("Failed to join network through {}: {}", bootstrap, err),
            }
        });
    }

    server.await?;
    Ok(())
}
