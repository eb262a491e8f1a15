//! Integration tests for the pool + migrations + store working together
//! against a file-backed database.

use sentinel_db::{
    count_for_agent, create_pool, events_for_agent, insert_event, run_migrations, DbSettings,
};
use sentinel_types::{ActionType, Actor, AuditEvent, EventStatus};
use std::time::Duration;

#[test]
fn events_survive_across_pooled_connections() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = dir.path().join("sentinel.db");
    let db_path = db_path.to_str().expect("utf-8 path");

    let pool = create_pool(
        db_path,
        DbSettings {
            busy_timeout: Duration::from_secs(1),
            pool_max_size: 2,
        },
    )
    .expect("pool creation should succeed");

    {
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
    }

    let event = AuditEvent::new(
        "agent-file",
        "trace-1",
        Actor::System,
        ActionType::FileWrite,
        "/tmp/report.txt",
        EventStatus::Success,
    );

    // Write on one connection, read on another.
    {
        let conn = pool.get().unwrap();
        assert!(insert_event(&conn, &event).unwrap());
    }
    {
        let conn = pool.get().unwrap();
        let events = events_for_agent(&conn, "agent-file", 100).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, event.event_id);
        assert_eq!(count_for_agent(&conn, "agent-file").unwrap(), 1);
    }
}

#[test]
fn duplicate_submissions_from_separate_connections_stay_deduplicated() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = dir.path().join("sentinel.db");
    let db_path = db_path.to_str().expect("utf-8 path");

    let pool = create_pool(db_path, DbSettings::default()).expect("pool creation should succeed");
    {
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
    }

    let event = AuditEvent::new(
        "agent-dup",
        "trace-1",
        Actor::Agent,
        ActionType::ApiCall,
        "billing/v2/charge",
        EventStatus::Pending,
    );

    let first = {
        let conn = pool.get().unwrap();
        insert_event(&conn, &event).unwrap()
    };
    let second = {
        let conn = pool.get().unwrap();
        insert_event(&conn, &event).unwrap()
    };

    assert!(first);
    assert!(!second);

    let conn = pool.get().unwrap();
    assert_eq!(count_for_agent(&conn, "agent-dup").unwrap(), 1);
}
