//! Domain core: rosters, polls, runoffs, and the reconciler that drives them.

pub mod audit;
pub mod ballot;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod render;
pub mod roster;
pub mod runoff;
pub mod status;

pub use audit::{
    build_audit_event, AuditEvent, AuditSink, EntityKind, InMemoryAuditSink, SharedAuditSink,
    TracingAuditSink,
};
pub use ballot::{normalize_title, Closure, PollEngine, Tally, TallyEntry};
pub use error::{MusterError, MusterResult};
pub use model::{
    Event, EventStatus, Membership, NewOption, Poll, PollOption, PollStatus, RosterCounts, Vote,
};
pub use reconciler::{Reconciler, Settlement, TickReport};
pub use roster::RosterManager;
pub use runoff::{Runoff, RunoffController};
pub use status::{resolve as resolve_status, DisplayStatus, STARTING_LEAD_MINUTES};
