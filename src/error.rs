//! Error types shared across the forwarder.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures on the event-source side of an exchange.
///
/// Each variant is turned into a client-facing HTTP response; none of them
/// are fatal to the process.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The inbound body could not be read or exceeded the size limit.
    #[error("Failed to read request body: {0}")]
    ReadBody(String),

    /// An origin-form request arrived and no origin is configured.
    #[error("No upstream origin for {0}")]
    NoOrigin(String),

    /// The origin could not be reached or returned an unreadable response.
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    /// The origin did not answer in time.
    #[error("Upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// An intercepted exchange was released without a completed exchange.
    #[error("Exchange {0} was abandoned before a response was installed")]
    Abandoned(String),
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ReadBody(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::NoOrigin(_) | Self::Upstream(_) | Self::Abandoned(_) => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}

/// Failures while delegating an exchange to the connector service.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Connection refused, DNS failure, malformed response.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// No response within the configured bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
