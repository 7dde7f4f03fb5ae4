use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::context::AppContext;
use crate::http::connection::Connection;

/// Binds the configured address and serves until the task is dropped.
pub async fn run(ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let addr = ctx.config.listen_addr.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %addr,
        upstream = %ctx.config.upstream.base_url,
        "Listening"
    );

    serve(listener, ctx).await
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, ctx: Arc<AppContext>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::debug!("Accepted connection from {}", peer);

        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, ctx);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
