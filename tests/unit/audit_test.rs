//! Tests for audit sink

use chrono::Utc;
use muster::core::{build_audit_event, AuditSink, EntityKind, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        EntityKind::Event,
        "evt1",
        "join",
        Some("alice".to_string()),
        Utc::now(),
        Some("1/5".to_string()),
    );

    sink.record(event);
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].kind, EntityKind::Event);
    assert_eq!(events[0].entity_id, "evt1");
    assert_eq!(events[0].action, "join");
    assert_eq!(events[0].actor.as_deref(), Some("alice"));
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    for i in 0..3 {
        sink.record(build_audit_event(
            EntityKind::Poll,
            format!("poll{i}"),
            "vote",
            None,
            Utc::now(),
            None,
        ));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].entity_id, "poll1");
    assert_eq!(events[1].entity_id, "poll2");
}

#[test]
fn test_audit_filter_by_action() {
    let mut sink = InMemoryAuditSink::new(10);
    for action in ["create", "vote", "vote", "close"] {
        sink.record(build_audit_event(EntityKind::Poll, "p", action, None, Utc::now(), None));
    }
    assert_eq!(sink.with_action("vote").len(), 2);
    assert_eq!(sink.with_action("runoff").len(), 0);
}

#[test]
fn test_tracing_sink_accepts_entries() {
    use muster::core::TracingAuditSink;

    let mut sink = TracingAuditSink;
    sink.record(build_audit_event(EntityKind::Event, "e", "remind", None, Utc::now(), None));
}
