//! Connector delegation path.
//!
//! # State Transitions
//! ```text
//! received → intercepted → delivered ─┐
//!                        └→ failed ───┴→ resumed
//! ```
//!
//! # Responsibilities
//! - Replay the intercepted request (method, every header, body) to the forward target
//! - Install the target's response, or a synthesized 502 on any failure
//! - Resume the exchange in every case
//!
//! # Design Decisions
//! - Runs on its own task so the event source's handler is only parked on the
//!   suspension, never on the outbound call
//! - Headers are forwarded from the ordered list, so duplicates survive
//! - The whole call, body included, is bounded by one timeout; no retries

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::ConnectorError;
use crate::flow::exchange::InterceptedExchange;
use crate::http::headers::HeaderList;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::observability::metrics;

/// Client for the connector service behind the forward target.
#[derive(Debug, Clone)]
pub struct ConnectorClient {
    client: reqwest::Client,
    forward_url: Url,
    timeout: Duration,
}

impl ConnectorClient {
    pub fn new(client: reqwest::Client, forward_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            forward_url,
            timeout,
        }
    }

    /// Delegate on a separate task.
    pub fn spawn(&self, intercepted: InterceptedExchange) -> JoinHandle<()> {
        let connector = self.clone();
        tokio::spawn(async move { connector.delegate(intercepted).await })
    }

    /// Produce the exchange's response and resume it.
    pub async fn delegate(&self, intercepted: InterceptedExchange) {
        let id = intercepted.id();
        let response = match self.call(intercepted.request()).await {
            Ok(response) => {
                tracing::info!(
                    exchange_id = %id,
                    status = %response.status,
                    "Delivered connector service response"
                );
                metrics::record_connector_outcome("delivered");
                response
            }
            Err(e) => {
                tracing::error!(exchange_id = %id, error = %e, "Error contacting connector service");
                metrics::record_connector_outcome("failed");
                Response::text(
                    StatusCode::BAD_GATEWAY,
                    format!("Error contacting connector service: {}", e),
                )
            }
        };
        intercepted.resume(response);
    }

    /// Replay `request` against the forward target.
    pub async fn call(&self, request: &Request) -> Result<Response, ConnectorError> {
        let mut headers = request.headers.clone();
        headers.strip_hop_by_hop();

        let call = async {
            let response = self
                .client
                .request(request.method.clone(), self.forward_url.clone())
                .headers(headers.to_header_map())
                .body(request.body.clone())
                .send()
                .await?;
            let status = response.status();
            let headers = downstream_headers(response.headers());
            let body = response.bytes().await?;
            Ok::<_, ConnectorError>(Response::new(status, headers, body))
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ConnectorError::Timeout(self.timeout))?
    }
}

/// Headers from the connector's response.
///
/// If any value is not visible text the set is treated as unreadable and
/// replaced with a generic content type.
pub fn downstream_headers(map: &HeaderMap) -> HeaderList {
    if map.values().all(|value| value.to_str().is_ok()) {
        return HeaderList::from(map);
    }
    tracing::warn!("Connector response headers unreadable, using generic content type");
    let mut fallback = HeaderList::new();
    fallback.append(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    fallback
}
