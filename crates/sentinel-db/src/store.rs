//! Persistence operations for audit events.
//!
//! All writes go through [`insert_event`], a single atomic upsert keyed by
//! `event_id`. Reads go through [`events_for_agent`] (newest first, bounded)
//! and [`count_for_agent`].

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use sentinel_types::AuditEvent;

/// Errors that can occur during event store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("event store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Metadata JSON serialization or deserialization failed.
    #[error("event store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Inserts an event, treating `event_id` as its identity.
///
/// The write is a single `INSERT ... ON CONFLICT DO NOTHING`, so two
/// concurrent submissions of the same `event_id` cannot race into duplicate
/// rows. Returns `true` if a row was inserted and `false` if the event was
/// already stored; a duplicate is not an error and never grows the table.
/// The first stored payload wins — conflicting payloads under the same id
/// are not reconciled.
///
/// The timestamp is normalized to UTC on write so that lexicographic
/// `ORDER BY timestamp` is chronological regardless of the submitted offset.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQL failure or
/// [`StoreError::Serialization`] if metadata cannot be serialized.
pub fn insert_event(conn: &Connection, event: &AuditEvent) -> Result<bool, StoreError> {
    let metadata_json = event
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let timestamp_utc = event.timestamp.with_timezone(&Utc).to_rfc3339();

    let changed = conn.execute(
        "INSERT INTO audit_events
            (event_id, timestamp, agent_instance_id, trace_id, actor, action_type,
             resource, status, latency_ms, metadata_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(event_id) DO NOTHING",
        params![
            event.event_id,
            timestamp_utc,
            event.agent_instance_id,
            event.trace_id,
            event.actor.as_str(),
            event.action_type.as_str(),
            event.resource,
            event.status.as_str(),
            event.latency_ms,
            metadata_json,
        ],
    )?;

    Ok(changed == 1)
}

/// Returns events for one agent instance, ordered by `timestamp` descending
/// (most recent first), bounded by `limit`.
///
/// An agent with no events yields an empty vector, not an error.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQL failure.
pub fn events_for_agent(
    conn: &Connection,
    agent_instance_id: &str,
    limit: i64,
) -> Result<Vec<AuditEvent>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, agent_instance_id, trace_id, actor, action_type,
                resource, status, latency_ms, metadata_json
         FROM audit_events
         WHERE agent_instance_id = ?1
         ORDER BY timestamp DESC, id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![agent_instance_id, limit], row_to_event)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }

    Ok(events)
}

/// Returns the total number of stored events for one agent instance.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQL failure.
pub fn count_for_agent(conn: &Connection, agent_instance_id: &str) -> Result<i64, StoreError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM audit_events WHERE agent_instance_id = ?1",
        params![agent_instance_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEvent> {
    let timestamp: String = row.get(1)?;
    let actor: String = row.get(4)?;
    let action_type: String = row.get(5)?;
    let status: String = row.get(7)?;
    let metadata_json: Option<String> = row.get(9)?;

    let timestamp = DateTime::parse_from_rfc3339(&timestamp).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let actor = actor.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>,
        )
    })?;
    let action_type = action_type.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>,
        )
    })?;
    let status = status.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>,
        )
    })?;
    let metadata = metadata_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                9,
                rusqlite::types::Type::Text,
                Box::new(e) as Box<dyn std::error::Error + Send + Sync>,
            )
        })?;

    Ok(AuditEvent {
        event_id: row.get(0)?,
        timestamp,
        agent_instance_id: row.get(2)?,
        trace_id: row.get(3)?,
        actor,
        action_type,
        resource: row.get(6)?,
        status,
        latency_ms: row.get(8)?,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;
    use chrono::{FixedOffset, TimeZone};
    use sentinel_types::{ActionType, Actor, EventStatus, Metadata};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    fn event_at(agent: &str, rfc3339: &str) -> AuditEvent {
        let mut event = AuditEvent::new(
            agent,
            "trace-1",
            Actor::Agent,
            ActionType::ToolCall,
            "web_search",
            EventStatus::Success,
        );
        event.timestamp = DateTime::parse_from_rfc3339(rfc3339).unwrap();
        event
    }

    #[test]
    fn insert_then_query_round_trips() {
        let conn = test_conn();

        let mut metadata = Metadata::new();
        metadata.insert("tool_name".into(), serde_json::json!("DuckDuckGo"));
        let event = event_at("a1", "2026-01-25T10:30:00+00:00")
            .with_latency_ms(342)
            .with_metadata(metadata.clone());

        assert!(insert_event(&conn, &event).unwrap());

        let events = events_for_agent(&conn, "a1", 100).unwrap();
        assert_eq!(events.len(), 1);
        let stored = &events[0];
        assert_eq!(stored.event_id, event.event_id);
        assert_eq!(stored.agent_instance_id, "a1");
        assert_eq!(stored.actor, Actor::Agent);
        assert_eq!(stored.action_type, ActionType::ToolCall);
        assert_eq!(stored.status, EventStatus::Success);
        assert_eq!(stored.latency_ms, Some(342));
        assert_eq!(stored.metadata, Some(metadata));
    }

    #[test]
    fn duplicate_event_id_does_not_grow_the_table() {
        let conn = test_conn();
        let event = event_at("a1", "2026-01-25T10:30:00+00:00");

        assert!(insert_event(&conn, &event).unwrap());
        assert!(!insert_event(&conn, &event).unwrap());

        // Even a conflicting payload under the same id stays a no-op.
        let mut conflicting = event.clone();
        conflicting.resource = "something_else".to_string();
        assert!(!insert_event(&conn, &conflicting).unwrap());

        assert_eq!(count_for_agent(&conn, "a1").unwrap(), 1);
        let events = events_for_agent(&conn, "a1", 100).unwrap();
        assert_eq!(events[0].resource, "web_search", "first write wins");
    }

    #[test]
    fn events_come_back_newest_first() {
        let conn = test_conn();
        let e1 = event_at("a1", "2026-01-25T10:00:00+00:00");
        let e2 = event_at("a1", "2026-01-25T11:00:00+00:00");
        let e3 = event_at("a1", "2026-01-25T12:00:00+00:00");

        // Insert out of order; timestamp is authoritative, not arrival.
        insert_event(&conn, &e2).unwrap();
        insert_event(&conn, &e3).unwrap();
        insert_event(&conn, &e1).unwrap();

        let events = events_for_agent(&conn, "a1", 100).unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec![&e3.event_id, &e2.event_id, &e1.event_id]);
    }

    #[test]
    fn offset_timestamps_are_normalized_for_ordering() {
        let conn = test_conn();
        // 09:00+05:00 is 04:00 UTC — earlier than 10:00 UTC despite the
        // larger wall-clock hour.
        let earlier = event_at("a1", "2026-01-25T09:00:00+05:00");
        let later = event_at("a1", "2026-01-25T10:00:00+00:00");

        insert_event(&conn, &earlier).unwrap();
        insert_event(&conn, &later).unwrap();

        let events = events_for_agent(&conn, "a1", 100).unwrap();
        assert_eq!(events[0].event_id, later.event_id);
        assert_eq!(events[1].event_id, earlier.event_id);

        let expected = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 25, 4, 0, 0)
            .unwrap();
        assert_eq!(events[1].timestamp, expected);
    }

    #[test]
    fn limit_bounds_the_result() {
        let conn = test_conn();
        for hour in 0..5 {
            let event = event_at("a1", &format!("2026-01-25T{hour:02}:00:00+00:00"));
            insert_event(&conn, &event).unwrap();
        }

        let events = events_for_agent(&conn, "a1", 2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(count_for_agent(&conn, "a1").unwrap(), 5);
    }

    #[test]
    fn unknown_agent_yields_empty_list() {
        let conn = test_conn();
        assert!(events_for_agent(&conn, "nobody", 100).unwrap().is_empty());
        assert_eq!(count_for_agent(&conn, "nobody").unwrap(), 0);
    }

    #[test]
    fn agents_do_not_see_each_others_events() {
        let conn = test_conn();
        insert_event(&conn, &event_at("a1", "2026-01-25T10:00:00+00:00")).unwrap();
        insert_event(&conn, &event_at("a2", "2026-01-25T11:00:00+00:00")).unwrap();

        let events = events_for_agent(&conn, "a1", 100).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].agent_instance_id, "a1");
    }
}
