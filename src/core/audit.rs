//! Audit trail of state transitions.
//!
//! Managers and the reconciler record one entry per transition they apply
//! (join, reminder, closure, runoff, ...). Sinks are synchronous and must not
//! block; the bundled sink keeps a bounded in-memory ring.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// An event roster.
    Event,
    /// A poll.
    Poll,
}

/// Audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Kind of the affected entity.
    pub kind: EntityKind,
    /// Affected entity id, rendered.
    pub entity_id: String,
    /// Action taken (create, join, leave, remind, finish, option, vote, close, runoff).
    pub action: String,
    /// Acting user, when the transition was user-triggered.
    pub actor: Option<String>,
    /// When the transition was applied.
    pub at: DateTime<Utc>,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit entry.
    fn record(&mut self, event: AuditEvent);
}

/// Audit sink shared between managers.
pub type SharedAuditSink = Arc<Mutex<dyn AuditSink>>;

/// Bounded in-memory audit sink; the oldest entries are dropped first.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a sink keeping at most `max_events` entries.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Snapshot of stored entries, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Entries with the given action.
    pub fn with_action(&self, action: &str) -> Vec<AuditEvent> {
        self.events.iter().filter(|e| e.action == action).cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Sink that forwards entries to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::debug!(
            target: "muster::audit",
            "{:?} {} {} actor={:?} detail={:?}",
            event.kind,
            event.entity_id,
            event.action,
            event.actor,
            event.detail
        );
    }
}

/// Helper to build an audit entry.
pub fn build_audit_event(
    kind: EntityKind,
    entity_id: impl ToString,
    action: impl Into<String>,
    actor: Option<String>,
    at: DateTime<Utc>,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        kind,
        entity_id: entity_id.to_string(),
        action: action.into(),
        actor,
        at,
        detail,
    }
}
