//! The audit event envelope and its closed enumerations.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EventValidationError, ParseEnumError};

/// Maximum length of `agent_instance_id` and `trace_id`, in characters.
pub const MAX_ID_CHARS: usize = 255;

/// Maximum length of `resource`, in characters.
pub const MAX_RESOURCE_CHARS: usize = 1024;

/// Who performed the recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    /// An autonomous agent process.
    Agent,
    /// A human operator acting through the agent.
    Human,
    /// The surrounding system itself (scheduler, runtime, etc.).
    System,
}

impl Actor {
    /// Returns the canonical wire label for this actor.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Human => "human",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Actor {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(Self::Agent),
            "human" => Ok(Self::Human),
            "system" => Ok(Self::System),
            _ => Err(ParseEnumError {
                kind: "actor",
                value: s.to_string(),
            }),
        }
    }
}

/// What kind of action was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A framework tool invocation.
    ToolCall,
    /// An outbound HTTP request.
    HttpRequest,
    /// A database query.
    DbQuery,
    /// A file read.
    FileRead,
    /// A file write.
    FileWrite,
    /// A third-party API call.
    ApiCall,
}

impl ActionType {
    /// Returns the canonical wire label for this action type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolCall => "tool_call",
            Self::HttpRequest => "http_request",
            Self::DbQuery => "db_query",
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::ApiCall => "api_call",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tool_call" => Ok(Self::ToolCall),
            "http_request" => Ok(Self::HttpRequest),
            "db_query" => Ok(Self::DbQuery),
            "file_read" => Ok(Self::FileRead),
            "file_write" => Ok(Self::FileWrite),
            "api_call" => Ok(Self::ApiCall),
            _ => Err(ParseEnumError {
                kind: "action_type",
                value: s.to_string(),
            }),
        }
    }
}

/// Outcome of the recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// The action completed successfully.
    Success,
    /// The action failed.
    Error,
    /// The action was still in flight when recorded.
    Pending,
}

impl EventStatus {
    /// Returns the canonical wire label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "pending" => Ok(Self::Pending),
            _ => Err(ParseEnumError {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Caller-supplied context attached to an event.
///
/// Flat key-value pairs, opaque to the pipeline. Redaction of sensitive
/// values is the caller's responsibility.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// The unit of record: one discrete action taken by an instrumented agent.
///
/// Unknown top-level fields on the wire are ignored during deserialization
/// (forward compatibility); `timestamp` must carry an explicit UTC offset or
/// deserialization fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Version-4 UUID identifying this logical event across delivery retries.
    pub event_id: String,
    /// When the action occurred (not when it was received), RFC 3339 with
    /// explicit offset. Future timestamps are permitted.
    pub timestamp: DateTime<FixedOffset>,
    /// Opaque identifier of the instrumented process.
    pub agent_instance_id: String,
    /// Opaque identifier correlating a logically related group of events.
    /// Not required to be unique.
    pub trace_id: String,
    /// Who performed the action.
    pub actor: Actor,
    /// What kind of action was performed.
    pub action_type: ActionType,
    /// The target of the action (URL, file path, tool name, ...). Must not
    /// carry secrets; that is the caller's responsibility.
    pub resource: String,
    /// Outcome of the action.
    pub status: EventStatus,
    /// Duration of the action in milliseconds, if measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,
    /// Caller-redacted context, opaque to the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AuditEvent {
    /// Constructs a new event with a generated `event_id` (UUID v4) and the
    /// current UTC time as `timestamp`.
    pub fn new(
        agent_instance_id: impl Into<String>,
        trace_id: impl Into<String>,
        actor: Actor,
        action_type: ActionType,
        resource: impl Into<String>,
        status: EventStatus,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().fixed_offset(),
            agent_instance_id: agent_instance_id.into(),
            trace_id: trace_id.into(),
            actor,
            action_type,
            resource: resource.into(),
            status,
            latency_ms: None,
            metadata: None,
        }
    }

    /// Attaches a latency measurement.
    pub fn with_latency_ms(mut self, latency_ms: i64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Attaches caller-supplied metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Checks that the required fields are structurally present.
    ///
    /// This is the capture-client-side check: non-empty required strings and
    /// a syntactically parseable `event_id`. Enum closure and the full rules
    /// in [`validate`](Self::validate) remain the server's authority.
    pub fn validate_structure(&self) -> Result<(), EventValidationError> {
        if self.event_id.is_empty() {
            return Err(EventValidationError::EmptyField { field: "event_id" });
        }
        if Uuid::parse_str(&self.event_id).is_err() {
            return Err(EventValidationError::InvalidEventId(self.event_id.clone()));
        }
        if self.agent_instance_id.is_empty() {
            return Err(EventValidationError::EmptyField {
                field: "agent_instance_id",
            });
        }
        if self.trace_id.is_empty() {
            return Err(EventValidationError::EmptyField { field: "trace_id" });
        }
        if self.resource.is_empty() {
            return Err(EventValidationError::EmptyField { field: "resource" });
        }
        Ok(())
    }

    /// Applies the full v1 validation rules.
    ///
    /// Enum closure and timestamp syntax are already enforced by the typed
    /// deserialization step; this covers everything the type system cannot:
    /// UUID version, length caps, and latency sign.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        self.validate_structure()?;

        // parse cannot fail here; validate_structure already checked syntax
        let id = Uuid::parse_str(&self.event_id)
            .map_err(|_| EventValidationError::InvalidEventId(self.event_id.clone()))?;
        if id.get_version_num() != 4 {
            return Err(EventValidationError::InvalidEventId(self.event_id.clone()));
        }

        if self.agent_instance_id.chars().count() > MAX_ID_CHARS {
            return Err(EventValidationError::FieldTooLong {
                field: "agent_instance_id",
                max: MAX_ID_CHARS,
            });
        }
        if self.trace_id.chars().count() > MAX_ID_CHARS {
            return Err(EventValidationError::FieldTooLong {
                field: "trace_id",
                max: MAX_ID_CHARS,
            });
        }
        if self.resource.chars().count() > MAX_RESOURCE_CHARS {
            return Err(EventValidationError::FieldTooLong {
                field: "resource",
                max: MAX_RESOURCE_CHARS,
            });
        }

        if let Some(latency) = self.latency_ms {
            if latency < 0 {
                return Err(EventValidationError::NegativeLatency(latency));
            }
        }

        Ok(())
    }
}
