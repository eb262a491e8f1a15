//! Error types for the capture client.

use sentinel_types::EventValidationError;

/// Errors that can occur when constructing an [`crate::AuditClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP transport could not be built.
    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors surfaced by [`crate::AuditClient::capture`].
///
/// Delivery failures are never surfaced here — capture is best-effort and
/// only malformed input is reported, and even that can be downgraded to
/// log-and-drop via [`crate::InvalidEventPolicy`].
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The event failed structural validation.
    #[error("invalid audit event: {0}")]
    InvalidEvent(#[from] EventValidationError),
}
