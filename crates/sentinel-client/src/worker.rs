//! The background delivery worker.
//!
//! A single worker task owns the buffer's receiving end and the HTTP
//! transport. It drains the buffer on a fixed interval and on demand when
//! the client flushes, delivering events FIFO within each drain cycle.
//! Transient failures are retried with exponential backoff; rejections and
//! certificate failures are not.

use crate::config::ClientConfig;
use reqwest::StatusCode;
use sentinel_types::AuditEvent;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// Commands sent from the client to its worker.
pub(crate) enum WorkerCommand {
    /// Drain the buffer now and report the result.
    Flush {
        /// Receives the drain cycle's report once delivery attempts finish.
        done: oneshot::Sender<FlushReport>,
    },
    /// Finish up and exit the worker loop.
    Shutdown,
}

/// Per-cycle delivery counts reported back to `flush` callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    /// Events acknowledged by the ingestion service.
    pub delivered: usize,
    /// Events dropped after exhausting their retry budget or being rejected.
    pub failed: usize,
}

/// How a delivery attempt failed, which decides whether to retry.
enum DeliveryError {
    /// Timeout, connection failure, or 5xx — worth retrying.
    Transient(String),
    /// TLS certificate validation failure — never retried, logged distinctly.
    Security(String),
    /// The server rejected the payload (4xx) — retrying cannot succeed.
    Rejected { status: StatusCode, detail: String },
}

pub(crate) struct DeliveryWorker {
    config: ClientConfig,
    http: reqwest::Client,
    events_url: String,
    buffer_rx: mpsc::Receiver<AuditEvent>,
    control_rx: mpsc::Receiver<WorkerCommand>,
}

impl DeliveryWorker {
    pub(crate) fn new(
        config: ClientConfig,
        http: reqwest::Client,
        buffer_rx: mpsc::Receiver<AuditEvent>,
        control_rx: mpsc::Receiver<WorkerCommand>,
    ) -> Self {
        let events_url = config.events_url();
        Self {
            config,
            http,
            events_url,
            buffer_rx,
            control_rx,
        }
    }

    /// Runs until shutdown, alternating between interval drains and
    /// on-demand flushes.
    pub(crate) async fn run(mut self) {
        let mut ticker = interval_at(
            Instant::now() + self.config.flush_interval,
            self.config.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.drain_cycle().await;
                }
                command = self.control_rx.recv() => match command {
                    Some(WorkerCommand::Flush { done }) => {
                        let report = self.drain_cycle().await;
                        let _ = done.send(report);
                    }
                    Some(WorkerCommand::Shutdown) | None => break,
                },
            }
        }

        tracing::debug!("delivery worker stopped");
    }

    /// Drains everything currently buffered and attempts delivery in FIFO
    /// enqueue order.
    async fn drain_cycle(&mut self) -> FlushReport {
        let mut batch = Vec::new();
        while let Ok(event) = self.buffer_rx.try_recv() {
            batch.push(event);
        }

        let mut report = FlushReport::default();
        if batch.is_empty() {
            return report;
        }

        tracing::debug!(count = batch.len(), "delivering buffered audit events");

        for event in batch {
            if self.deliver_with_retry(&event).await {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }

    /// Delivers one event, absorbing transient failures up to the attempt
    /// budget. Returns whether the event was acknowledged.
    async fn deliver_with_retry(&self, event: &AuditEvent) -> bool {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.post_event(event).await {
                Ok(()) => {
                    tracing::debug!(event_id = %event.event_id, attempt, "event delivered");
                    return true;
                }
                Err(DeliveryError::Rejected { status, detail }) => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        %status,
                        detail,
                        "event rejected by ingestion service, not retrying"
                    );
                    return false;
                }
                Err(DeliveryError::Security(reason)) => {
                    tracing::error!(
                        event_id = %event.event_id,
                        reason,
                        "certificate validation failed, not retrying"
                    );
                    return false;
                }
                Err(DeliveryError::Transient(reason)) => {
                    if attempt < max_attempts {
                        let backoff = backoff_for(self.config.initial_backoff, attempt - 1);
                        tracing::warn!(
                            event_id = %event.event_id,
                            attempt,
                            max_attempts,
                            backoff_ms = backoff.as_millis() as u64,
                            reason,
                            "delivery attempt failed, retrying"
                        );
                        sleep(backoff).await;
                    } else {
                        tracing::error!(
                            event_id = %event.event_id,
                            attempts = max_attempts,
                            reason,
                            "delivery failed after final attempt, dropping event"
                        );
                    }
                }
            }
        }

        false
    }

    async fn post_event(&self, event: &AuditEvent) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(&self.events_url)
            .json(event)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        match classify_response_status(status) {
            ResponseClass::Accepted => Ok(()),
            ResponseClass::Transient => Err(DeliveryError::Transient(format!(
                "server returned {status}"
            ))),
            ResponseClass::Rejected => {
                let detail = response.text().await.unwrap_or_default();
                Err(DeliveryError::Rejected { status, detail })
            }
        }
    }
}

enum ResponseClass {
    Accepted,
    Transient,
    Rejected,
}

fn classify_response_status(status: StatusCode) -> ResponseClass {
    if status.is_success() {
        ResponseClass::Accepted
    } else if status.is_server_error() {
        ResponseClass::Transient
    } else {
        ResponseClass::Rejected
    }
}

/// Splits transport errors into security failures (never retried) and
/// transient ones.
///
/// reqwest does not expose a typed certificate error, so the source chain is
/// inspected for the rustls certificate failure descriptions.
fn classify_transport_error(err: reqwest::Error) -> DeliveryError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(current) = source {
        let text = current.to_string();
        if text.contains("certificate") || text.contains("Certificate") {
            return DeliveryError::Security(format!("{err}: {text}"));
        }
        source = current.source();
    }

    DeliveryError::Transient(err.to_string())
}

/// Backoff before retry number `retry_index + 1`: the initial backoff doubled
/// once per prior retry.
fn backoff_for(initial: Duration, retry_index: u32) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(retry_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_retry() {
        let initial = Duration::from_secs(1);
        assert_eq!(backoff_for(initial, 0), Duration::from_secs(1));
        assert_eq!(backoff_for(initial, 1), Duration::from_secs(2));
        assert_eq!(backoff_for(initial, 2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let initial = Duration::from_secs(1);
        let huge = backoff_for(initial, u32::MAX);
        assert!(huge >= backoff_for(initial, 10));
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_response_status(StatusCode::CREATED),
            ResponseClass::Accepted
        ));
        assert!(matches!(
            classify_response_status(StatusCode::INTERNAL_SERVER_ERROR),
            ResponseClass::Transient
        ));
        assert!(matches!(
            classify_response_status(StatusCode::SERVICE_UNAVAILABLE),
            ResponseClass::Transient
        ));
        assert!(matches!(
            classify_response_status(StatusCode::UNPROCESSABLE_ENTITY),
            ResponseClass::Rejected
        ));
        assert!(matches!(
            classify_response_status(StatusCode::BAD_REQUEST),
            ResponseClass::Rejected
        ));
    }
}
