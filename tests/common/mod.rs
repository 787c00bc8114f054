//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use flow_forwarder::config::ForwarderConfig;
use flow_forwarder::http::HttpServer;
use flow_forwarder::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A request as seen by a mock server.
#[derive(Debug)]
#[allow(dead_code)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Start a mock server that records every request and answers with a fixed
/// status and body after `delay`.
pub async fn start_mock_server(
    status: StatusCode,
    body: &'static str,
    delay: Duration,
) -> (SocketAddr, mpsc::UnboundedReceiver<Recorded>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let app = Router::new().fallback(move |request: Request<Body>| {
        let tx = tx.clone();
        async move {
            let (parts, incoming) = request.into_parts();
            let bytes = axum::body::to_bytes(incoming, usize::MAX)
                .await
                .unwrap_or_default();
            let _ = tx.send(Recorded {
                method: parts.method,
                path: parts.uri.path().to_string(),
                headers: parts.headers,
                body: bytes,
            });
            tokio::time::sleep(delay).await;
            (status, [("x-mock", "1")], body)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, rx)
}

/// Start a mock origin that always answers 200 with `body` sent under the
/// given `content-encoding`.
#[allow(dead_code)]
pub async fn start_encoded_server(body: Vec<u8>, encoding: &'static str) -> SocketAddr {
    let body = Bytes::from(body);
    let app = Router::new().fallback(move || {
        let body = body.clone();
        async move { (StatusCode::OK, [("content-encoding", encoding)], body) }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Config pointing at a mock origin and a mock forward target.
pub fn config_for(origin: SocketAddr, forward_target: SocketAddr) -> ForwarderConfig {
    let mut config = ForwarderConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.origin = Some(origin.to_string());
    config.forward.url = format!("http://{}/receive", forward_target);
    config.observability.metrics_enabled = false;
    config
}

/// Start the forwarder on an ephemeral port.
pub async fn start_forwarder(config: ForwarderConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Wait for the next recorded request, or `None` after `within`.
pub async fn next_recorded(
    rx: &mut mpsc::UnboundedReceiver<Recorded>,
    within: Duration,
) -> Option<Recorded> {
    tokio::time::timeout(within, rx.recv()).await.ok().flatten()
}
