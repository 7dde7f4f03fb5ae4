use crate::config::Config;
use crate::proxy::upstream::UpstreamClient;

/// Everything a request handler needs, built once at startup and shared
/// read-only across connections.
#[derive(Debug)]
pub struct AppContext {
    pub config: Config,
    pub upstream: UpstreamClient,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        let upstream = UpstreamClient::new(&config.upstream);
        Self { config, upstream }
    }

    /// Replaces the upstream client, e.g. one with shorter timeouts in tests.
    pub fn with_upstream(mut self, upstream: UpstreamClient) -> Self {
        self.upstream = upstream;
        self
    }
}
