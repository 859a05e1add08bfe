use std::time::Duration;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about, long_about = "Proof-of-work ledger node with longest-chain consensus")]
pub struct Args {
    /// Port the HTTP API listens on.
    #[arg(short, long, default_value_t = 3001)]
    pub port: u16,

    /// Interface the HTTP API binds to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// URL peers use to reach this node. Defaults to http://localhost:<port>.
    #[arg(long)]
    pub node_url: Option<String>,

    /// A node of an existing network to join at startup.
    #[arg(short, long)]
    pub bootstrap: Option<String>,

    /// Seconds before a call to a peer is abandoned.
    #[arg(long, default_value_t = 30)]
    pub peer_timeout_secs: u64,
}

impl Args {
    pub fn node_url(&self) -> String {
        self.node_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}
