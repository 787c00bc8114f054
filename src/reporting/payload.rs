//! Enrichment report JSON schema.
//!
//! ```text
//! {
//!   "flow_id": "...",
//!   "request":  { "method", "url", "headers_list", "headers", "body" },
//!   "response": { "status_code", "headers_list", "headers", "body" }
//! }
//! ```
//!
//! Field names and nesting are contract surface for the reporting endpoint.
//! Bodies have their `Content-Encoding` undone, then are decoded as UTF-8
//! with replacement characters, never failing.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::flow::exchange::ExchangeId;
use crate::http::headers::{serialize_headers, HeaderList};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::reporting::encoding::decoded_body;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    pub flow_id: String,
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers_list: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub headers_list: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl EnrichmentReport {
    /// Snapshot a request/response pair.
    pub fn build(id: ExchangeId, request: &Request, response: &Response) -> Self {
        let request_headers = serialize_headers(&request.headers);
        let response_headers = serialize_headers(&response.headers);

        Self {
            flow_id: id.to_string(),
            request: RequestSnapshot {
                method: request.method.to_string(),
                url: request.url(),
                headers_list: request_headers.pairs,
                headers: request_headers.last_win,
                body: body_text(&request.headers, &request.body),
            },
            response: ResponseSnapshot {
                status_code: response.status.as_u16(),
                headers_list: response_headers.pairs,
                headers: response_headers.last_win,
                body: body_text(&response.headers, &response.body),
            },
        }
    }
}

fn body_text(headers: &HeaderList, body: &[u8]) -> String {
    String::from_utf8_lossy(&decoded_body(headers, body)).into_owned()
}
