//! Architectural Contract Test: HTTP Source
//!
//! This test verifies the HTTP source against a local server.
//!
//! Constraints verified:
//! - The endpoint list is read in the shared wire format
//! - A daemon's forward snapshot can feed another daemon's source
//! - Error statuses, malformed bodies and timeouts fail the call
//!
//! If this test fails, chained daemons publish garbage or nothing.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use zonepop_core::builtin::{EndpointCache, HttpCacheProvider};
use zonepop_core::{Endpoint, EndpointFilter, EndpointSource, Provider};
use zonepop_source_http::HttpSource;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn reads_endpoint_list() {
    let app = Router::new().route(
        "/endpoints",
        get(|| async { r#"[{"hostname":"nas","ipv4s":["192.0.2.10"],"ttl":300}]"# }),
    );
    let base = serve(app).await;

    let source = HttpSource::new(format!("{base}/endpoints"), Duration::from_secs(5)).unwrap();
    let endpoints = assert_ok!(source.endpoints().await);

    assert_eq!(
        endpoints,
        vec![Endpoint::new("nas").with_ipv4("192.0.2.10").with_ttl(300)]
    );
}

#[tokio::test]
async fn reads_a_forward_snapshot() {
    let cache = EndpointCache::new();
    let provider = HttpCacheProvider::new(cache.clone(), EndpointFilter::accept_all());
    let published = vec![
        Endpoint::new("nas").with_ipv4("192.0.2.10"),
        Endpoint::new("printer").with_ipv6("2001:db8::20"),
    ];
    assert_ok!(provider.update_endpoints(&published).await);

    let app = Router::new().route(
        "/endpoints/forward",
        get(move || {
            let cache = cache.clone();
            async move { cache.forward().to_string() }
        }),
    );
    let base = serve(app).await;

    let source =
        HttpSource::new(format!("{base}/endpoints/forward"), Duration::from_secs(5)).unwrap();
    assert_eq!(assert_ok!(source.endpoints().await), published);
}

#[tokio::test]
async fn error_status_fails() {
    let app = Router::new().route(
        "/endpoints",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let base = serve(app).await;

    let source = HttpSource::new(format!("{base}/endpoints"), Duration::from_secs(5)).unwrap();
    let err = assert_err!(source.endpoints().await);
    assert!(err.to_string().contains("503"), "error was: {err}");
}

#[tokio::test]
async fn malformed_body_fails() {
    let app = Router::new().route("/endpoints", get(|| async { "<html>login</html>" }));
    let base = serve(app).await;

    let source = HttpSource::new(format!("{base}/endpoints"), Duration::from_secs(5)).unwrap();
    let err = assert_err!(source.endpoints().await);
    assert!(err.to_string().contains("Invalid endpoint list"), "error was: {err}");
}

#[tokio::test]
async fn slow_server_times_out() {
    let app = Router::new().route(
        "/endpoints",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            "[]"
        }),
    );
    let base = serve(app).await;

    let source =
        HttpSource::new(format!("{base}/endpoints"), Duration::from_millis(100)).unwrap();
    assert_err!(source.endpoints().await);
}
