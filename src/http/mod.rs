//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → request.rs (buffer body, resolve upstream target)
//!     → [flow interceptor: request hook]
//!     → server.rs (forward to origin via hyper-util client)
//!     → response.rs (buffer response)
//!     → [flow interceptor: response hook]
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use headers::{serialize_headers, HeaderList, SerializedHeaders};
pub use server::HttpServer;
