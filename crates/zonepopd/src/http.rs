//! HTTP exposure: Prometheus metrics and the forward endpoint snapshot

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use zonepop_core::builtin::EndpointCache;
use zonepop_core::metrics::gather_metrics;

/// Bind the listener for the HTTP server
///
/// Called before the controller starts; a bind failure is a startup error.
pub async fn bind(bind_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP server to {bind_addr}: {e}"))
}

/// Serve until `shutdown` is cancelled
pub async fn start_http_server(
    listener: TcpListener,
    cache: EndpointCache,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let bind_addr = listener.local_addr()?;
    info!(
        bind_address = %bind_addr,
        metrics_url = format!("http://{bind_addr}/metrics"),
        "HTTP server started"
    );

    axum::serve(listener, create_app(cache))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .inspect_err(|e| error!(error = %e, "HTTP server failed"))?;

    info!("HTTP server stopped");
    Ok(())
}

fn create_app(cache: EndpointCache) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/endpoints/forward", get(forward_handler))
        .with_state(cache)
}

async fn metrics_handler() -> Response {
    match gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn forward_handler(State(cache): State<EndpointCache>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        cache.forward().to_string(),
    )
        .into_response()
}
