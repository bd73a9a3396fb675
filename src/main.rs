use std::env;

use anyhow::Context;
use tokio::net::TcpListener;

use ragdesk::core::logging;
use ragdesk::server;
use ragdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize()
        .await
        .context("Failed to initialize application state")?;
    logging::init(&state.paths);

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(state.settings.server.port);
    let bind_addr = format!("{}:{}", state.settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        "Listening on {} ({} entries in {})",
        addr,
        state.store.count(),
        state.settings.store_path.display()
    );

    let app = server::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
