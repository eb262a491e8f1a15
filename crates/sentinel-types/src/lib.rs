//! Canonical audit event model for the Sentinel pipeline.
//!
//! Defines the [`AuditEvent`] envelope shared by the capture client, the
//! ingestion service, and storage, together with its closed enumerations
//! and validation rules. An event is constructed once by the instrumented
//! caller and never mutated afterwards; `event_id` defines its identity
//! across retried delivery attempts.
//!
//! # Usage
//!
//! ```rust
//! use sentinel_types::{Actor, ActionType, AuditEvent, EventStatus};
//!
//! let event = AuditEvent::new(
//!     "agent-001",
//!     "trace-abc",
//!     Actor::Agent,
//!     ActionType::ToolCall,
//!     "web_search",
//!     EventStatus::Success,
//! )
//! .with_latency_ms(342);
//!
//! assert!(event.validate().is_ok());
//! ```

mod error;
mod event;

pub use error::{EventValidationError, ParseEnumError};
pub use event::{ActionType, Actor, AuditEvent, EventStatus, Metadata};
