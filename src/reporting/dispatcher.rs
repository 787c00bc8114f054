//! Fire-and-forget delivery of enrichment reports.
//!
//! # Responsibilities
//! - Accept reports from response handlers without ever blocking them
//! - Post each report as JSON to the forward target, bounded by a timeout
//! - Cap concurrent posts
//!
//! # Design Decisions
//! - Bounded queue; when full the report is dropped with a warning
//! - A semaphore bounds in-flight posts; no retries
//! - Failures are logged and counted, nothing else

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Semaphore};
use url::Url;

use crate::observability::metrics;
use crate::reporting::payload::EnrichmentReport;

/// Handle used by response handlers to schedule reports.
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: mpsc::Sender<EnrichmentReport>,
}

impl Reporter {
    /// Create a reporter and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EnrichmentReport>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue a report. Returns `false` if it was dropped.
    pub fn submit(&self, report: EnrichmentReport) -> bool {
        let flow_id = report.flow_id.clone();
        match self.tx.try_send(report) {
            Ok(()) => {
                tracing::info!(exchange_id = %flow_id, "Scheduled enriched send");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(exchange_id = %flow_id, "Report queue full, dropping enriched send");
                metrics::record_report("dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(exchange_id = %flow_id, "Report dispatcher stopped, dropping enriched send");
                metrics::record_report("dropped");
                false
            }
        }
    }
}

/// Drains the report queue and posts to the reporting endpoint.
#[derive(Debug, Clone)]
pub struct ReportDispatcher {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    in_flight: Arc<Semaphore>,
}

impl ReportDispatcher {
    pub fn new(client: reqwest::Client, endpoint: Url, timeout: Duration, max_in_flight: usize) -> Self {
        Self {
            client,
            endpoint,
            timeout,
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    /// Run until the queue closes or shutdown is signalled.
    pub async fn run(
        self,
        mut queue: mpsc::Receiver<EnrichmentReport>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(endpoint = %self.endpoint, "Report dispatcher starting");

        loop {
            tokio::select! {
                report = queue.recv() => {
                    let Some(report) = report else {
                        break;
                    };
                    let Ok(permit) = self.in_flight.clone().acquire_owned().await else {
                        break;
                    };
                    let dispatcher = self.clone();
                    tokio::spawn(async move {
                        dispatcher.send(report).await;
                        drop(permit);
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("Report dispatcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Post a single report. Failures are logged, never returned.
    pub async fn send(&self, report: EnrichmentReport) {
        let result = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(&report)
            .send()
            .await;

        match result {
            Ok(response) => {
                tracing::info!(
                    exchange_id = %report.flow_id,
                    status = %response.status(),
                    "Sent enriched request+response to service"
                );
                metrics::record_report("sent");
            }
            Err(e) => {
                tracing::error!(
                    exchange_id = %report.flow_id,
                    error = %e,
                    "Failed to send enriched request+response to service"
                );
                metrics::record_report("failed");
            }
        }
    }
}
