//! Request classification and the normal enrichment path.
//!
//! # Data Flow
//! ```text
//! request-received
//!     → x-source == connector-service ? ──▶ connector.rs (intercept + delegate)
//!     → otherwise strip correlation (+ extra) headers → store.put → forward upstream
//!
//! response-received
//!     → store.take_if_present ── absent ──▶ done, response untouched
//!     → restore correlation header + add marker on the client-bound response
//!     → copy request/response, reinstate every removed header in the copies
//!     → payload.rs → Reporter::submit (fire-and-forget)
//! ```
//!
//! # Design Decisions
//! - Exactly one of {delegation, normal forwarding} happens per request; the
//!   `RequestVerdict` type makes the two mutually exclusive
//! - The client-facing response is finalized before the report is scheduled

use axum::http::HeaderName;

use crate::flow::connector::ConnectorClient;
use crate::flow::exchange::{Exchange, Suspension};
use crate::flow::rules::HeaderRules;
use crate::flow::store::{ExchangeStore, RemovedHeaders};
use crate::observability::metrics;
use crate::reporting::{EnrichmentReport, Reporter};

/// What the event source must do after the request hook.
#[derive(Debug)]
pub enum RequestVerdict {
    /// Forward upstream as usual, then call [`FlowInterceptor::on_response`].
    Forward(Exchange),
    /// The exchange is suspended; await the suspension for the response.
    Intercepted(Suspension),
}

/// Request/response hooks installed on the event source.
#[derive(Debug, Clone)]
pub struct FlowInterceptor {
    rules: HeaderRules,
    store: ExchangeStore,
    connector: ConnectorClient,
    reporter: Reporter,
}

impl FlowInterceptor {
    pub fn new(
        rules: HeaderRules,
        store: ExchangeStore,
        connector: ConnectorClient,
        reporter: Reporter,
    ) -> Self {
        Self {
            rules,
            store,
            connector,
            reporter,
        }
    }

    pub fn rules(&self) -> &HeaderRules {
        &self.rules
    }

    pub fn store(&self) -> &ExchangeStore {
        &self.store
    }

    /// Request-received hook.
    pub fn on_request(&self, mut exchange: Exchange) -> RequestVerdict {
        let id = exchange.id();

        if self.rules.is_connector(&exchange.request.headers) {
            tracing::info!(
                exchange_id = %id,
                method = %exchange.request.method,
                "Connector-service request: intercepting and sending to forward target"
            );
            metrics::record_exchange("connector");
            let (intercepted, suspension) = exchange.intercept();
            self.connector.spawn(intercepted);
            return RequestVerdict::Intercepted(suspension);
        }

        metrics::record_exchange("normal");
        let mut removed = RemovedHeaders::new();
        for name in &self.rules.stripped {
            if let Some(value) = exchange.request.headers.get(name) {
                exchange.request.headers.remove(name);
                removed.insert(name.clone(), value);
            }
        }

        if !removed.is_empty() {
            tracing::info!(
                exchange_id = %id,
                headers = ?names(&removed),
                "Normal request: stored removed headers"
            );
            self.store.put(id, removed);
        }
        RequestVerdict::Forward(exchange)
    }

    /// Response-received hook for exchanges that were not intercepted.
    pub fn on_response(&self, exchange: &mut Exchange) {
        let id = exchange.id();
        let Some(removed) = self.store.take_if_present(&id) else {
            return;
        };
        let Some(response) = exchange.response.as_mut() else {
            tracing::warn!(exchange_id = %id, "Response hook fired without a response");
            return;
        };

        if let Some(value) = removed.get(&self.rules.correlation_header) {
            response
                .headers
                .set(self.rules.correlation_header.clone(), value);
        }
        response
            .headers
            .set(self.rules.marker_header.clone(), self.rules.marker_value.clone());

        let mut request_copy = exchange.request.clone();
        let mut response_copy = response.clone();
        for (name, value) in removed.iter() {
            request_copy.headers.set(name.clone(), value.clone());
            response_copy.headers.set(name.clone(), value.clone());
        }

        let report = EnrichmentReport::build(id, &request_copy, &response_copy);
        self.reporter.submit(report);
    }

    /// Error hook: the origin never answered, so no response hook will fire.
    pub fn on_error(&self, exchange: &Exchange) {
        if self.store.take_if_present(&exchange.id()).is_some() {
            tracing::debug!(exchange_id = %exchange.id(), "Discarded stored headers for failed exchange");
        }
    }
}

fn names(removed: &RemovedHeaders) -> Vec<&HeaderName> {
    removed.iter().map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::HeaderList;
    use crate::http::request::Request;
    use crate::http::response::Response;
    use crate::reporting::EnrichmentReport;
    use axum::http::{HeaderValue, StatusCode, Uri};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use url::Url;

    fn interceptor(rules: HeaderRules) -> (FlowInterceptor, mpsc::Receiver<EnrichmentReport>) {
        let (reporter, rx) = Reporter::channel(16);
        let connector = ConnectorClient::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:9/receive").unwrap(),
            Duration::from_secs(1),
        );
        (FlowInterceptor::new(rules, ExchangeStore::new(), connector, reporter), rx)
    }

    fn request(pairs: &[(&'static str, &'static str)]) -> Request {
        Request {
            uri: Uri::from_static("http://origin.test/path"),
            headers: pairs
                .iter()
                .map(|&(k, v)| (HeaderName::from_static(k), HeaderValue::from_static(v)))
                .collect::<HeaderList>(),
            ..Request::default()
        }
    }

    fn forward(verdict: RequestVerdict) -> Exchange {
        match verdict {
            RequestVerdict::Forward(exchange) => exchange,
            RequestVerdict::Intercepted(_) => panic!("expected normal forwarding"),
        }
    }

    #[tokio::test]
    async fn correlation_header_is_stripped_and_restored() {
        let (interceptor, mut reports) = interceptor(HeaderRules::default());
        let exchange = Exchange::new(request(&[("x-request-id", "abc123"), ("accept", "*/*")]));

        let mut exchange = forward(interceptor.on_request(exchange));
        let correlation = HeaderName::from_static("x-request-id");
        assert!(!exchange.request.headers.contains(&correlation));
        assert_eq!(interceptor.store().len(), 1);

        exchange.response = Some(Response::text(StatusCode::OK, "hello"));
        interceptor.on_response(&mut exchange);
        assert!(interceptor.store().is_empty());

        let response = exchange.response.as_ref().unwrap();
        assert_eq!(response.headers.get(&correlation).unwrap(), "abc123");
        assert_eq!(response.headers.get(&HeaderName::from_static("x-state")).unwrap(), "response");
        // The live request stays stripped; only the report copy is reinstated.
        assert!(!exchange.request.headers.contains(&correlation));

        let report = reports.recv().await.unwrap();
        assert_eq!(report.flow_id, exchange.id().to_string());
        assert_eq!(report.request.headers["x-request-id"], "abc123");
        assert_eq!(report.response.headers["x-request-id"], "abc123");
        assert_eq!(report.response.headers["x-state"], "response");
        assert_eq!(report.response.body, "hello");
    }

    #[tokio::test]
    async fn no_correlation_header_means_no_entry_and_no_report() {
        let (interceptor, mut reports) = interceptor(HeaderRules::default());
        let mut exchange = forward(interceptor.on_request(Exchange::new(request(&[("accept", "*/*")]))));
        assert!(interceptor.store().is_empty());

        exchange.response = Some(Response::text(StatusCode::NOT_FOUND, "missing"));
        interceptor.on_response(&mut exchange);

        let response = exchange.response.as_ref().unwrap();
        assert!(!response.headers.contains(&HeaderName::from_static("x-state")));
        assert_eq!(response.headers.len(), 1);
        assert!(reports.try_recv().is_err());
    }

    #[tokio::test]
    async fn extra_stripped_headers_reach_only_the_report() {
        let mut rules = HeaderRules::default();
        rules.stripped.push(HeaderName::from_static("x-trace-token"));
        let (interceptor, mut reports) = interceptor(rules);

        let exchange = Exchange::new(request(&[("x-request-id", "r-1"), ("x-trace-token", "t-1")]));
        let mut exchange = forward(interceptor.on_request(exchange));
        assert!(exchange.request.headers.is_empty());

        exchange.response = Some(Response::text(StatusCode::OK, "ok"));
        interceptor.on_response(&mut exchange);

        let response = exchange.response.as_ref().unwrap();
        assert!(!response.headers.contains(&HeaderName::from_static("x-trace-token")));

        let report = reports.recv().await.unwrap();
        assert_eq!(report.request.headers["x-trace-token"], "t-1");
        assert_eq!(report.response.headers["x-trace-token"], "t-1");
    }

    #[tokio::test]
    async fn connector_requests_are_never_forwarded() {
        let (interceptor, _reports) = interceptor(HeaderRules::default());
        let exchange = Exchange::new(request(&[("x-source", "connector-service"), ("x-request-id", "abc")]));

        match interceptor.on_request(exchange) {
            RequestVerdict::Intercepted(suspension) => {
                // Forward target is unreachable, so delegation fails and resumes with 502.
                let exchange = suspension.wait().await.unwrap();
                assert_eq!(exchange.response.unwrap().status, StatusCode::BAD_GATEWAY);
            }
            RequestVerdict::Forward(_) => panic!("connector request took the normal path"),
        }
        assert!(interceptor.store().is_empty());
    }

    #[tokio::test]
    async fn error_hook_discards_stored_entry() {
        let (interceptor, mut reports) = interceptor(HeaderRules::default());
        let exchange = forward(interceptor.on_request(Exchange::new(request(&[("x-request-id", "abc")]))));
        assert_eq!(interceptor.store().len(), 1);

        interceptor.on_error(&exchange);
        assert!(interceptor.store().is_empty());
        assert!(reports.try_recv().is_err());
    }
}
