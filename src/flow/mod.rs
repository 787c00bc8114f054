//! Flow interception subsystem.
//!
//! # Data Flow
//! ```text
//! event source (http/server.rs)
//!     → interceptor.rs on_request
//!         ├─ connector path: exchange.rs intercept → connector.rs (task) → resume
//!         └─ normal path:    rules.rs strip → store.rs put → forward upstream
//!     → interceptor.rs on_response (normal path only)
//!         → store.rs take_if_present → restore + mark → reporting/
//! ```

pub mod connector;
pub mod exchange;
pub mod interceptor;
pub mod rules;
pub mod store;

pub use connector::ConnectorClient;
pub use exchange::{Exchange, ExchangeId, ExchangeState, InterceptedExchange, Suspension};
pub use interceptor::{FlowInterceptor, RequestVerdict};
pub use rules::HeaderRules;
pub use store::{ExchangeStore, RemovedHeaders};
