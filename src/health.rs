//! Liveness endpoint
//!
//! Hosting platforms probe the container over HTTP to decide whether it is
//! alive. Any GET answers 200 regardless of path; other methods get 405.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Body returned to every probe
pub const LIVENESS_BODY: &str = "Bot is running!";

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, LIVENESS_BODY)
}

/// Router answering GET on any path
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/{*path}", get(liveness))
}

/// Bind the listener on all interfaces
///
/// # Errors
///
/// Returns an error if the port is taken or not permitted.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Health server listening on {addr}");
    Ok(listener)
}

/// Serve probes until `shutdown` is cancelled
///
/// # Errors
///
/// Returns an error if the server stops on an I/O failure.
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
