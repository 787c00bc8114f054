//! Enrichment reporting subsystem.
//!
//! # Data Flow
//! ```text
//! interceptor (response hook)
//!     → payload.rs (snapshot request + response as JSON-ready structs)
//!         → encoding.rs (undo Content-Encoding on the snapshot bodies)
//!     → Reporter::submit (bounded queue, never blocks)
//!     → dispatcher.rs (POST to forward target, bounded in-flight, timeout)
//! ```

pub mod dispatcher;
pub mod encoding;
pub mod payload;

pub use dispatcher::{ReportDispatcher, Reporter};
pub use payload::EnrichmentReport;
