use log::info;

/// Known peer node URLs, excluding this node's own
///
/// Peers are never removed; an unreachable peer stays registered for the
/// lifetime of the process.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    self_url: String,
    peers: Vec<String>,
}

/// Trims whitespace and trailing slashes so equivalent URLs compare equal
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

impl PeerRegistry {
    pub fn new(self_url: &str) -> Self {
        PeerRegistry {
            self_url: normalize_url(self_url),
            peers: Vec::new(),
        }
    }

    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// Registered peers, in registration order
    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Adds a peer unless it is this node or already known
    ///
    /// # Returns
    ///
    /// true if the registry grew
    pub fn register(&mut self, url: &str) -> bool {
        let url = normalize_url(url);
        if url.is_empty() || url == self.self_url || self.peers.contains(&url) {
            return false;
        }

        info!("Registered peer {}", url);
        self.peers.push(url);
        true
    }

    /// Registers every URL in `urls`
    ///
    /// # Returns
    ///
    /// The number of peers that were new
    pub fn register_all<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter(|url| self.register(url.as_ref()))
            .count()
    }

    /// The peer list handed to a joining node: every known peer plus this node
    pub fn network_view(&self) -> Vec<String> {
        let mut view = self.peers.clone();
        view.push(self.self_url.clone());
        view
    }
}
