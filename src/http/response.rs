//! Buffered response value type.
//!
//! # Responsibilities
//! - Hold a status, ordered headers and body as an owned, cloneable value
//! - Synthesize plain-text error responses
//! - Convert to an axum response for delivery to the client

use axum::body::{Body, Bytes};
use axum::http::{self, header, HeaderValue, Method, StatusCode};

use crate::http::headers::HeaderList;

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderList,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderList, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A `text/plain` response carrying `message` as its body.
    pub fn text(status: StatusCode, message: impl Into<String>) -> Self {
        let mut headers = HeaderList::new();
        headers.append(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self::new(status, headers, message.into())
    }

    /// Buffer a response received from the origin.
    pub async fn from_upstream(
        response: http::Response<hyper::body::Incoming>,
        max_body_bytes: usize,
    ) -> Result<Self, axum::Error> {
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), max_body_bytes).await?;
        Ok(Self::new(parts.status, HeaderList::from(&parts.headers), body))
    }

    /// Convert into the response delivered to the client.
    ///
    /// Framing is recomputed from the buffered body, except for `HEAD`
    /// where the origin's `content-length` describes a body never sent.
    pub fn into_http(self, method: &Method) -> axum::response::Response {
        let mut headers = self.headers;
        let head_length = if *method == Method::HEAD {
            headers.get_all(&header::CONTENT_LENGTH).next().cloned()
        } else {
            None
        };
        headers.strip_hop_by_hop();
        if let Some(length) = head_length {
            headers.append(header::CONTENT_LENGTH, length);
        }

        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers.to_header_map();
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_is_plain_text() {
        let response = Response::text(StatusCode::BAD_GATEWAY, "boom");
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers.get(&header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(response.body, Bytes::from_static(b"boom"));
    }

    #[test]
    fn into_http_keeps_duplicate_headers() {
        let mut headers = HeaderList::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.append(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let response = Response::new(StatusCode::OK, headers, "ok").into_http(&Method::GET);
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
    }

    #[test]
    fn head_response_keeps_origin_content_length() {
        let mut headers = HeaderList::new();
        headers.append(header::CONTENT_LENGTH, HeaderValue::from_static("1234"));

        let head = Response::new(StatusCode::OK, headers.clone(), Bytes::new()).into_http(&Method::HEAD);
        assert_eq!(head.headers()[header::CONTENT_LENGTH], "1234");

        let get = Response::new(StatusCode::OK, headers, Bytes::new()).into_http(&Method::GET);
        assert!(get.headers().get(header::CONTENT_LENGTH).is_none());
    }
}
