//! HTTP forwarding layer with connector delegation and enrichment reporting.

pub mod config;
pub mod error;
pub mod flow;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod reporting;

pub use config::schema::ForwarderConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
