//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the forwarder.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the forwarder.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Origin server used for normal-path forwarding.
    pub upstream: UpstreamConfig,

    /// Connector/reporting service target.
    pub forward: ForwardConfig,

    /// Header names and sentinel values driving classification.
    pub headers: HeaderConfig,

    /// Enrichment report delivery.
    pub reporting: ReportingConfig,

    /// Stored removed-headers expiry.
    pub store: StoreConfig,

    /// Client-facing timeouts.
    pub timeouts: TimeoutConfig,

    /// Body size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// `host:port` of the origin for origin-form requests.
    /// Absolute-form (explicit proxy) requests ignore it.
    pub origin: Option<String>,

    /// Total time allowed for the origin to respond, in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: None,
            timeout_secs: 30,
        }
    }
}

/// The single forward target shared by the connector and reporting paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Forward URL.
    pub url: String,

    /// Bound on each outbound call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9000/receive".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Header names and values used to classify and enrich exchanges.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Discriminator header selecting the connector path.
    pub source_header: String,

    /// Value of `source_header` that selects the connector path.
    pub connector_source: String,

    /// Correlation header stripped upstream and restored client-side.
    pub correlation_header: String,

    /// Further headers stripped upstream and reinstated only in reports.
    pub extra_stripped: Vec<String>,

    /// Marker header added to enriched responses.
    pub marker_header: String,

    /// Value of the marker header.
    pub marker_value: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            source_header: "x-source".to_string(),
            connector_source: "connector-service".to_string(),
            correlation_header: "x-request-id".to_string(),
            extra_stripped: Vec::new(),
            marker_header: "x-state".to_string(),
            marker_value: "response".to_string(),
        }
    }
}

/// Report dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Reports waiting to be sent; further reports are dropped.
    pub queue_capacity: usize,

    /// Maximum concurrent report posts.
    pub max_in_flight: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_in_flight: 32,
        }
    }
}

/// Exchange store expiry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Entries older than this are evicted, in seconds.
    pub entry_ttl_secs: u64,

    /// How often the sweeper runs, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            entry_ttl_secs: 300,
            sweep_interval_secs: 30,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time a client request may take, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum buffered body size in bytes (requests and responses).
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
