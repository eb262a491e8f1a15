//! Error types for the event model.

/// Errors produced when validating an [`crate::AuditEvent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventValidationError {
    /// `event_id` is not a syntactically valid version-4 UUID.
    #[error("event_id is not a valid UUIDv4: {0:?}")]
    InvalidEventId(String),

    /// A required string field is empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// The name of the offending field.
        field: &'static str,
    },

    /// A string field exceeds its length cap.
    #[error("{field} exceeds {max} characters")]
    FieldTooLong {
        /// The name of the offending field.
        field: &'static str,
        /// The maximum permitted length in characters.
        max: usize,
    },

    /// `latency_ms` carried a negative value.
    #[error("latency_ms must be non-negative, got {0}")]
    NegativeLatency(i64),
}

/// Error returned when parsing an unknown enumeration label.
///
/// The enumerations are closed in v1: any label outside the listed set is a
/// validation failure, never a silent coercion.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    /// Which enumeration was being parsed (e.g. `"actor"`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}
