use std::sync::Arc;

use openbanking_proxy::config::Config;
use openbanking_proxy::context::AppContext;
use openbanking_proxy::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    let filter = EnvFilter::try_new(cfg.effective_log_level())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!(
        environment = ?cfg.environment,
        debug = cfg.debug_enabled(),
        "Starting OpenBanking API Client"
    );
    tracing::debug!(config = ?cfg, "Loaded configuration");

    let ctx = Arc::new(AppContext::new(cfg));

    tokio::select! {
        res = server::run(ctx) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
