//! Buffered request value type.
//!
//! # Responsibilities
//! - Capture an inbound axum request as an owned, cloneable value
//! - Resolve the upstream target (absolute-form URI or configured origin)
//! - Rebuild a hyper request for forwarding
//!
//! # Design Decisions
//! - Bodies are buffered (bounded by `limits.max_body_bytes`); `Bytes` clones
//!   share the buffer, so copies taken for reporting are cheap and immutable

use axum::body::{Body, Bytes};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{self, Method, Uri};

use crate::error::ForwardError;
use crate::http::headers::HeaderList;

/// A fully buffered HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderList,
    pub body: Bytes,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderList::new(),
            body: Bytes::new(),
        }
    }
}

impl Request {
    /// Buffer an inbound request.
    ///
    /// Origin-form URIs are rewritten against `origin` so the request always
    /// carries the URL it will be forwarded to.
    pub async fn from_http(
        request: http::Request<Body>,
        origin: Option<&Authority>,
        max_body_bytes: usize,
    ) -> Result<Self, ForwardError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, max_body_bytes)
            .await
            .map_err(|e| ForwardError::ReadBody(e.to_string()))?;

        Ok(Self {
            method: parts.method,
            uri: resolve_target(parts.uri, origin),
            headers: HeaderList::from(&parts.headers),
            body,
        })
    }

    /// The full URL as reported to observers.
    pub fn url(&self) -> String {
        self.uri.to_string()
    }

    /// Build the hyper request sent to the origin.
    pub fn to_upstream(&self) -> Result<http::Request<Body>, ForwardError> {
        if self.uri.authority().is_none() {
            return Err(ForwardError::NoOrigin(self.uri.to_string()));
        }

        let mut headers = self.headers.clone();
        headers.strip_hop_by_hop();

        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri.clone());
        if let Some(map) = builder.headers_mut() {
            *map = headers.to_header_map();
        }
        builder
            .body(Body::from(self.body.clone()))
            .map_err(|e| ForwardError::Upstream(e.to_string()))
    }
}

fn resolve_target(uri: Uri, origin: Option<&Authority>) -> Uri {
    if uri.authority().is_some() {
        return uri;
    }
    let Some(origin) = origin else {
        return uri;
    };

    let mut parts = uri.clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(origin.clone());
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    Uri::from_parts(parts).unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_form_is_rewritten_against_origin() {
        let origin = Authority::from_static("127.0.0.1:3000");
        let uri = resolve_target(Uri::from_static("/items?page=2"), Some(&origin));
        assert_eq!(uri.to_string(), "http://127.0.0.1:3000/items?page=2");
    }

    #[test]
    fn absolute_form_is_kept() {
        let origin = Authority::from_static("127.0.0.1:3000");
        let uri = resolve_target(Uri::from_static("http://example.com/a"), Some(&origin));
        assert_eq!(uri.to_string(), "http://example.com/a");
    }

    #[test]
    fn upstream_requires_authority() {
        let request = Request {
            uri: Uri::from_static("/no-origin"),
            ..Request::default()
        };
        assert!(matches!(request.to_upstream(), Err(ForwardError::NoOrigin(_))));
    }

    #[tokio::test]
    async fn from_http_buffers_body_and_headers() {
        let inbound = http::Request::builder()
            .method(Method::POST)
            .uri("/submit")
            .header("x-request-id", "abc123")
            .header("transfer-encoding", "chunked")
            .body(Body::from("payload"))
            .unwrap();
        let origin = Authority::from_static("origin.test:8080");

        let request = Request::from_http(inbound, Some(&origin), 1024).await.unwrap();
        assert_eq!(request.url(), "http://origin.test:8080/submit");
        assert_eq!(request.body, Bytes::from_static(b"payload"));

        let upstream = request.to_upstream().unwrap();
        assert_eq!(upstream.headers()["x-request-id"], "abc123");
        assert!(upstream.headers().get("transfer-encoding").is_none());
    }

    #[tokio::test]
    async fn from_http_rejects_oversized_body() {
        let inbound = http::Request::builder()
            .uri("/big")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();
        let result = Request::from_http(inbound, None, 16).await;
        assert!(matches!(result, Err(ForwardError::ReadBody(_))));
    }
}
