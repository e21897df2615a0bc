use axum::{Router, routing::get};
use std::net::SocketAddr;

pub const ALIVE: &str = "WeatherBot is alive!";

async fn alive() -> &'static str {
    ALIVE
}

pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

/// Serve the liveness route until the process exits.
///
/// Runs on its own task and shares nothing with the scheduler.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "health endpoint listening");

    axum::serve(listener, router()).await?;
    Ok(())
}
