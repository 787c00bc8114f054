//! HTTP server: the event source driving the flow interceptor.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Buffer each request into an `Exchange` and fire the request hook
//! - Forward normal-path requests to the origin, fire the response hook
//! - Park intercepted exchanges on their suspension until resumed
//! - Spawn the report dispatcher and store sweeper alongside the server

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{uri::Authority, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::config::{ConfigError, ForwarderConfig};
use crate::config::validation::ValidationError;
use crate::error::ForwardError;
use crate::flow::{
    ConnectorClient, Exchange, ExchangeStore, FlowInterceptor, HeaderRules, RequestVerdict,
};
use crate::http::request::Request as FlowRequest;
use crate::http::response::Response as FlowResponse;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::reporting::{EnrichmentReport, ReportDispatcher, Reporter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub interceptor: FlowInterceptor,
    pub client: Client<HttpConnector, Body>,
    pub origin: Option<Authority>,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
}

/// HTTP server for the forwarder.
pub struct HttpServer {
    router: Router,
    config: ForwarderConfig,
    store: ExchangeStore,
    dispatcher: ReportDispatcher,
    report_queue: mpsc::Receiver<EnrichmentReport>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ForwarderConfig) -> Result<Self, ConfigError> {
        let rules = HeaderRules::from_config(&config.headers)?;
        let forward_url = Url::parse(&config.forward.url).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::new("forward.url", e.to_string())])
        })?;
        let origin = config
            .upstream
            .origin
            .as_deref()
            .map(str::parse::<Authority>)
            .transpose()
            .map_err(|e| {
                ConfigError::Validation(vec![ValidationError::new("upstream.origin", e.to_string())])
            })?;

        let outbound_timeout = Duration::from_millis(config.forward.timeout_ms);
        let outbound = reqwest::Client::new();

        let store = ExchangeStore::new();
        let (reporter, report_queue) = Reporter::channel(config.reporting.queue_capacity);
        let dispatcher = ReportDispatcher::new(
            outbound.clone(),
            forward_url.clone(),
            outbound_timeout,
            config.reporting.max_in_flight,
        );
        let connector = ConnectorClient::new(outbound, forward_url, outbound_timeout);
        let interceptor = FlowInterceptor::new(rules, store.clone(), connector, reporter);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            interceptor,
            client,
            origin,
            upstream_timeout: Duration::from_secs(config.upstream.timeout_secs),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            store,
            dispatcher,
            report_queue,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ForwarderConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            forward_url = %self.config.forward.url,
            origin = ?self.config.upstream.origin,
            "HTTP server starting"
        );

        tokio::spawn(self.dispatcher.run(self.report_queue, shutdown.subscribe()));
        tokio::spawn(self.store.run_sweeper(
            Duration::from_secs(self.config.store.entry_ttl_secs),
            Duration::from_secs(self.config.store.sweep_interval_secs),
            shutdown.subscribe(),
        ));

        let mut server_shutdown = shutdown.subscribe();

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request =
        match FlowRequest::from_http(request, state.origin.as_ref(), state.max_body_bytes).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected request");
                return e.into_response();
            }
        };

    let exchange = Exchange::new(request);
    tracing::debug!(
        exchange_id = %exchange.id(),
        method = %exchange.request.method,
        url = %exchange.request.url(),
        "Request received"
    );

    match state.interceptor.on_request(exchange) {
        RequestVerdict::Forward(exchange) => forward(&state, exchange).await,
        RequestVerdict::Intercepted(suspension) => match suspension.wait().await {
            Ok(exchange) => exchange.into_http(),
            Err(e) => {
                tracing::error!(error = %e, "Intercepted exchange abandoned");
                e.into_response()
            }
        },
    }
}

/// Forward a normal-path exchange to the origin and run the response hook.
async fn forward(state: &AppState, mut exchange: Exchange) -> Response {
    let id = exchange.id();
    match send_upstream(state, &exchange.request).await {
        Ok(response) => {
            exchange.response = Some(response);
            state.interceptor.on_response(&mut exchange);
            exchange.finish();
            exchange.into_http()
        }
        Err(e) => {
            tracing::error!(exchange_id = %id, error = %e, "Upstream error");
            state.interceptor.on_error(&exchange);
            e.into_response()
        }
    }
}

async fn send_upstream(state: &AppState, request: &FlowRequest) -> Result<FlowResponse, ForwardError> {
    let start = Instant::now();
    let upstream = request.to_upstream()?;

    let response = tokio::time::timeout(state.upstream_timeout, state.client.request(upstream))
        .await
        .map_err(|_| ForwardError::UpstreamTimeout(state.upstream_timeout))?
        .map_err(|e| ForwardError::Upstream(e.to_string()))?;

    let response = FlowResponse::from_upstream(response, state.max_body_bytes)
        .await
        .map_err(|e| ForwardError::Upstream(e.to_string()))?;
    metrics::record_upstream(response.status.as_u16(), start);
    Ok(response)
}
