//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and header names/values
//! - Validate value ranges (timeouts > 0, bounded queues)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ForwarderConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::uri::Authority;
use axum::http::{HeaderName, HeaderValue};
use url::Url;

use crate::config::schema::ForwarderConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ForwarderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Some(origin) = &config.upstream.origin {
        if origin.parse::<Authority>().is_err() {
            errors.push(ValidationError::new(
                "upstream.origin",
                format!("'{}' is not a host:port authority", origin),
            ));
        }
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }

    match Url::parse(&config.forward.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "forward.url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("forward.url", e.to_string())),
    }
    if config.forward.timeout_ms == 0 {
        errors.push(ValidationError::new("forward.timeout_ms", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else {
        // Connector exchanges stay suspended for up to forward.timeout_ms.
        if config.timeouts.request_secs.saturating_mul(1000) <= config.forward.timeout_ms {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                "must exceed forward.timeout_ms so suspended exchanges can resume",
            ));
        }
        // Otherwise the handler is cancelled before the upstream error hook runs.
        if config.timeouts.request_secs <= config.upstream.timeout_secs {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                "must exceed upstream.timeout_secs so failed forwards are cleaned up",
            ));
        }
    }

    let headers = &config.headers;
    let names = [
        ("headers.source_header", &headers.source_header),
        ("headers.correlation_header", &headers.correlation_header),
        ("headers.marker_header", &headers.marker_header),
    ];
    for (field, name) in names {
        check_header_name(&mut errors, field, name);
    }
    for name in &headers.extra_stripped {
        check_header_name(&mut errors, "headers.extra_stripped", name);
    }
    let values = [
        ("headers.connector_source", &headers.connector_source),
        ("headers.marker_value", &headers.marker_value),
    ];
    for (field, value) in values {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not a valid header value", value)));
        }
    }

    if config.reporting.queue_capacity == 0 {
        errors.push(ValidationError::new("reporting.queue_capacity", "must be greater than 0"));
    }
    if config.reporting.max_in_flight == 0 {
        errors.push(ValidationError::new("reporting.max_in_flight", "must be greater than 0"));
    }

    if config.store.entry_ttl_secs == 0 {
        errors.push(ValidationError::new("store.entry_ttl_secs", "must be greater than 0"));
    } else if config.store.entry_ttl_secs <= config.upstream.timeout_secs
        || config.store.entry_ttl_secs <= config.timeouts.request_secs
    {
        // An entry must outlive every exchange that can still consume it.
        errors.push(ValidationError::new(
            "store.entry_ttl_secs",
            "must exceed upstream.timeout_secs and timeouts.request_secs",
        ));
    }
    if config.store.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("store.sweep_interval_secs", "must be greater than 0"));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_header_name(errors: &mut Vec<ValidationError>, field: &str, name: &str) {
    if HeaderName::from_bytes(name.as_bytes()).is_err() {
        errors.push(ValidationError::new(field, format!("'{}' is not a valid header name", name)));
    }
}
