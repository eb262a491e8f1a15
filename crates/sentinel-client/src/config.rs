//! Capture client configuration.

use std::time::Duration;

/// What `capture` does with an event that fails structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidEventPolicy {
    /// Return the validation error to the caller.
    #[default]
    Reject,
    /// Log a warning and drop the event, keeping `capture` infallible.
    LogAndDrop,
}

/// Configuration for [`crate::AuditClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the ingestion service (e.g. `http://localhost:8000`).
    /// Trailing slashes are stripped.
    pub endpoint: String,

    /// Capacity of the in-memory event buffer. When full, newly captured
    /// events are dropped (drop-newest).
    pub buffer_size: usize,

    /// How often the delivery worker drains the buffer on its own.
    pub flush_interval: Duration,

    /// Maximum delivery attempts per event, including the first.
    pub max_attempts: u32,

    /// Backoff before the first retry; doubles after each further failure.
    pub initial_backoff: Duration,

    /// Per-request timeout for POSTs to the ingestion endpoint.
    pub request_timeout: Duration,

    /// Disables TLS certificate verification on the transport. Off by
    /// default; only for test setups with self-signed certificates.
    pub danger_accept_invalid_certs: bool,

    /// What to do when `capture` receives a structurally invalid event.
    pub invalid_event_policy: InvalidEventPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            buffer_size: 100,
            flush_interval: Duration::from_secs(5),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            request_timeout: Duration::from_secs(5),
            danger_accept_invalid_certs: false,
            invalid_event_policy: InvalidEventPolicy::Reject,
        }
    }
}

impl ClientConfig {
    /// Returns the event submission URL for this endpoint.
    pub(crate) fn events_url(&self) -> String {
        format!("{}/v1/events", self.endpoint.trim_end_matches('/'))
    }
}
