//! Exchange lifecycle and the suspension handle used for interception.
//!
//! # States
//! ```text
//! Pending ──intercept()──▶ Intercepted ──resume()/drop──▶ Completed
//!    │                                                       ▲
//!    └────────────── finish() (normal path) ─────────────────┘
//! ```
//!
//! # Design Decisions
//! - Intercepting consumes the `Exchange`: the delegation task owns an
//!   [`InterceptedExchange`] and the event source awaits a [`Suspension`]
//! - Dropping an `InterceptedExchange` without resuming it resumes with a
//!   synthesized 502, so a suspended client can never be left hanging

use std::fmt;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::ForwardError;
use crate::http::request::Request;
use crate::http::response::Response;

/// Stable identifier of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where an exchange is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Request observed, no response yet.
    Pending,
    /// Paused, awaiting external delegation.
    Intercepted,
    /// Response attached and released to the client.
    Completed,
}

/// One client request and its eventual response.
#[derive(Debug)]
pub struct Exchange {
    id: ExchangeId,
    pub request: Request,
    pub response: Option<Response>,
    state: ExchangeState,
}

impl Exchange {
    pub fn new(request: Request) -> Self {
        Self {
            id: ExchangeId::new(),
            request,
            response: None,
            state: ExchangeState::Pending,
        }
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Pause the exchange until the returned handle is resumed.
    pub fn intercept(self) -> (InterceptedExchange, Suspension) {
        let (tx, rx) = oneshot::channel();
        tracing::debug!(exchange_id = %self.id, "Exchange intercepted");
        let intercepted = InterceptedExchange {
            id: self.id,
            request: self.request,
            tx: Some(tx),
        };
        (intercepted, Suspension { id: self.id, rx })
    }

    /// Mark the exchange as released to the client.
    pub fn finish(&mut self) {
        self.state = ExchangeState::Completed;
    }

    /// Convert the attached response into the client-facing response.
    pub fn into_http(self) -> axum::response::Response {
        match self.response {
            Some(response) => response.into_http(&self.request.method),
            None => ForwardError::Abandoned(self.id.to_string()).into_response(),
        }
    }
}

/// A paused exchange, owned by whatever will produce its response.
#[derive(Debug)]
pub struct InterceptedExchange {
    id: ExchangeId,
    request: Request,
    tx: Option<oneshot::Sender<Exchange>>,
}

impl InterceptedExchange {
    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn state(&self) -> ExchangeState {
        ExchangeState::Intercepted
    }

    /// Install `response` and release the exchange to the client.
    pub fn resume(mut self, response: Response) {
        self.complete(response);
    }

    fn complete(&mut self, response: Response) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let exchange = Exchange {
            id: self.id,
            request: std::mem::take(&mut self.request),
            response: Some(response),
            state: ExchangeState::Completed,
        };
        if tx.send(exchange).is_err() {
            tracing::debug!(exchange_id = %self.id, "Client went away before resume");
        } else {
            tracing::debug!(exchange_id = %self.id, "Exchange resumed");
        }
    }
}

impl Drop for InterceptedExchange {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!(exchange_id = %self.id, "Intercepted exchange dropped without a response");
            self.complete(Response::text(
                StatusCode::BAD_GATEWAY,
                "Exchange was released without a response",
            ));
        }
    }
}

/// The event-source side of an interception.
#[derive(Debug)]
pub struct Suspension {
    id: ExchangeId,
    rx: oneshot::Receiver<Exchange>,
}

impl Suspension {
    pub fn id(&self) -> ExchangeId {
        self.id
    }

    /// Wait for the exchange to be resumed.
    pub async fn wait(self) -> Result<Exchange, ForwardError> {
        self.rx
            .await
            .map_err(|_| ForwardError::Abandoned(self.id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[tokio::test]
    async fn resume_delivers_response() {
        let exchange = Exchange::new(Request::default());
        assert_eq!(exchange.state(), ExchangeState::Pending);

        let (intercepted, suspension) = exchange.intercept();
        assert_eq!(intercepted.id(), suspension.id());
        assert_eq!(intercepted.state(), ExchangeState::Intercepted);
        tokio::spawn(async move {
            intercepted.resume(Response::text(StatusCode::OK, "ok"));
        });

        let exchange = suspension.wait().await.unwrap();
        assert_eq!(exchange.state(), ExchangeState::Completed);
        let response = exchange.response.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Bytes::from_static(b"ok"));
    }

    #[tokio::test]
    async fn dropping_without_resume_still_releases() {
        let (intercepted, suspension) = Exchange::new(Request::default()).intercept();
        drop(intercepted);

        let exchange = suspension.wait().await.unwrap();
        assert_eq!(exchange.response.unwrap().status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn panicking_delegate_still_releases() {
        let (intercepted, suspension) = Exchange::new(Request::default()).intercept();
        let task = tokio::spawn(async move {
            let _held = intercepted;
            panic!("delegate failed while building a response");
        });
        assert!(task.await.is_err());

        let exchange = suspension.wait().await.unwrap();
        assert_eq!(exchange.response.unwrap().status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn exchange_ids_are_unique() {
        assert_ne!(ExchangeId::new(), ExchangeId::new());
    }
}
