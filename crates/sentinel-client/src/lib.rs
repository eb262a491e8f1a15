//! Non-blocking audit capture client for the Sentinel pipeline.
//!
//! [`AuditClient`] accepts events from an instrumented caller and returns
//! immediately: events go into a bounded in-memory buffer and a single
//! background delivery worker drains it, batches events, and POSTs them to
//! the ingestion endpoint with retry and exponential backoff. Audit capture
//! is best-effort by design — delivery failures are logged and absorbed,
//! never surfaced to the caller, and the caller's thread never performs
//! network I/O.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sentinel_client::{AuditClient, ClientConfig};
//! use sentinel_types::{ActionType, Actor, AuditEvent, EventStatus};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AuditClient::new(ClientConfig {
//!     endpoint: "http://localhost:8000".to_string(),
//!     ..ClientConfig::default()
//! })?;
//!
//! client.capture(AuditEvent::new(
//!     "agent-001",
//!     "trace-abc",
//!     Actor::Agent,
//!     ActionType::ToolCall,
//!     "web_search",
//!     EventStatus::Success,
//! ))?;
//!
//! // At shutdown: deliver whatever is still buffered, bounded by a timeout.
//! let outcome = client.close(Duration::from_secs(10)).await;
//! println!("final flush: {outcome:?}");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod worker;

pub use config::{ClientConfig, InvalidEventPolicy};
pub use error::{CaptureError, ClientError};
pub use worker::FlushReport;

use sentinel_types::AuditEvent;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use worker::{DeliveryWorker, WorkerCommand};

/// How long `close` waits for the worker task to wind down after its final
/// flush before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Outcome of a [`AuditClient::flush`] call.
///
/// The disposition of buffered events is always observable: either the drain
/// cycle completed and reported per-event counts, or the time budget elapsed
/// first and undelivered events remain with the worker (to be retried on its
/// next cycle or dropped once their retry budget is spent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The drain cycle completed within the time budget.
    Flushed(FlushReport),
    /// The time budget elapsed before the drain cycle completed.
    TimedOut,
}

/// Non-blocking audit capture client.
///
/// Construction spawns exactly one background delivery worker; the worker's
/// lifetime is tied to the client's. Dropping the client aborts the worker,
/// so use [`close`](Self::close) at shutdown to drain the buffer first.
pub struct AuditClient {
    buffer_tx: mpsc::Sender<AuditEvent>,
    control_tx: mpsc::Sender<WorkerCommand>,
    worker: Option<JoinHandle<()>>,
    invalid_event_policy: InvalidEventPolicy,
}

impl AuditClient {
    /// Creates a client and starts its delivery worker.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the HTTP transport cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
            .build()?;

        let (buffer_tx, buffer_rx) = mpsc::channel(config.buffer_size);
        let (control_tx, control_rx) = mpsc::channel(8);

        let invalid_event_policy = config.invalid_event_policy;
        let worker = DeliveryWorker::new(config, http, buffer_rx, control_rx);
        let handle = tokio::spawn(worker.run());

        tracing::debug!("audit client started");

        Ok(Self {
            buffer_tx,
            control_tx,
            worker: Some(handle),
            invalid_event_policy,
        })
    }

    /// Enqueues an event for background delivery and returns immediately.
    ///
    /// Never blocks and never performs I/O. If the buffer is full the event
    /// is dropped (drop-newest policy) with a warning — graceful degradation
    /// is preferred over backpressure on the caller's hot path.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidEvent`] if a required field is missing,
    /// unless the client was configured with
    /// [`InvalidEventPolicy::LogAndDrop`], in which case malformed input is
    /// logged and dropped instead.
    pub fn capture(&self, event: AuditEvent) -> Result<(), CaptureError> {
        if let Err(err) = event.validate_structure() {
            match self.invalid_event_policy {
                InvalidEventPolicy::Reject => return Err(CaptureError::InvalidEvent(err)),
                InvalidEventPolicy::LogAndDrop => {
                    tracing::warn!(error = %err, "dropping malformed audit event");
                    return Ok(());
                }
            }
        }

        match self.buffer_tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    "audit buffer full, dropping newest event"
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    "delivery worker stopped, dropping event"
                );
                Ok(())
            }
        }
    }

    /// Forces an immediate drain-and-deliver cycle, waiting up to `timeout`.
    ///
    /// Returns [`FlushOutcome::Flushed`] with per-event counts once delivery
    /// attempts complete, or [`FlushOutcome::TimedOut`] if the budget elapses
    /// first.
    pub async fn flush(&self, timeout: Duration) -> FlushOutcome {
        let flush = async {
            let (done_tx, done_rx) = oneshot::channel();
            if self
                .control_tx
                .send(WorkerCommand::Flush { done: done_tx })
                .await
                .is_err()
            {
                return None;
            }
            done_rx.await.ok()
        };

        match tokio::time::timeout(timeout, flush).await {
            Ok(Some(report)) => FlushOutcome::Flushed(report),
            Ok(None) => {
                // Worker gone; nothing left to deliver to.
                tracing::warn!("flush requested but delivery worker has stopped");
                FlushOutcome::TimedOut
            }
            Err(_) => FlushOutcome::TimedOut,
        }
    }

    /// Flushes remaining events and shuts the worker down.
    ///
    /// The final flush is bounded by `timeout`; the worker then gets a short
    /// grace period to exit before being aborted.
    pub async fn close(mut self, timeout: Duration) -> FlushOutcome {
        let outcome = self.flush(timeout).await;

        let _ = self.control_tx.send(WorkerCommand::Shutdown).await;
        if let Some(mut handle) = self.worker.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                handle.abort();
            }
        }

        tracing::debug!("audit client closed");
        outcome
    }
}

impl Drop for AuditClient {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            handle.abort();
        }
    }
}
