//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! interceptor / connector / dispatcher / store
//!     → logging.rs (structured log events, exchange_id on every line)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
