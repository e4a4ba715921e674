use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use travel_assistant::build_app_state;
use travel_assistant::config::Config;
use travel_assistant::handlers::router;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    let bind: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}' (expected host:port)", config.server.bind))?;

    let state = build_app_state(&config).context("Failed to initialize travel assistant")?;
    let bearer_token = config.server.bearer_token.clone();
    let app = router(state, bearer_token.clone());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        version = %config.server.version,
        model = %config.llm.model,
        environment = %config.server.environment,
        auth = %bearer_token.as_deref().map(|_| "bearer").unwrap_or("none"),
        "Starting travel assistant server"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
