//! Storage contracts consumed by the core, plus the bundled backends.
//!
//! The traits mirror the CRUD surface the managers and the reconciler need:
//! lookups by id, field-level updates, and the time-window queries used on each
//! tick. Per-entity atomicity of read-check-write sequences is provided above the
//! store by [`crate::util::EntityLocks`], so backends only need single-call atomicity.

pub mod memory;
pub mod snapshot;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::error::MusterResult;
use crate::core::model::{Event, EventStatus, NewOption, Poll, PollOption, PollStatus, Vote};
use crate::util::ids::{EventId, MessageId, OptionId, PollId, UserId};

pub use memory::InMemoryStore;
pub use snapshot::{PollSnapshot, StoreSnapshot};

/// Event persistence.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a new event. Fails if the id already exists.
    async fn insert_event(&self, event: Event) -> MusterResult<()>;

    /// Fetch an event by id.
    async fn get_event(&self, id: EventId) -> MusterResult<Option<Event>>;

    /// Replace the participant set.
    async fn set_participants(&self, id: EventId, participants: BTreeSet<UserId>) -> MusterResult<()>;

    /// Overwrite the persisted status.
    async fn set_event_status(&self, id: EventId, status: EventStatus) -> MusterResult<()>;

    /// Remember the published card of an event.
    async fn set_event_message(&self, id: EventId, message: MessageId) -> MusterResult<()>;

    /// `Planned` events whose start lies in `[from, to]`.
    async fn events_due_for_reminder(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> MusterResult<Vec<Event>>;

    /// Events of any status whose start lies in `[from, to]`, earliest first, at most `limit`.
    async fn events_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> MusterResult<Vec<Event>>;
}

/// Poll, option, and vote persistence.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Insert a new poll. Fails if the id already exists.
    async fn insert_poll(&self, poll: Poll) -> MusterResult<()>;

    /// Fetch a poll by id.
    async fn get_poll(&self, id: PollId) -> MusterResult<Option<Poll>>;

    /// Overwrite the poll status.
    async fn set_poll_status(&self, id: PollId, status: PollStatus) -> MusterResult<()>;

    /// Move the deadline.
    async fn set_poll_deadline(&self, id: PollId, deadline: DateTime<Utc>) -> MusterResult<()>;

    /// Remember the published card of a poll.
    async fn set_poll_message(&self, id: PollId, message: MessageId) -> MusterResult<()>;

    /// `Open` polls whose deadline is at or before `now`.
    async fn overdue_polls(&self, now: DateTime<Utc>) -> MusterResult<Vec<Poll>>;

    /// The most recently created `Open` poll.
    async fn latest_open_poll(&self) -> MusterResult<Option<Poll>>;

    /// Append an option with the next sequential id of its poll.
    async fn insert_option(&self, poll: PollId, option: NewOption) -> MusterResult<PollOption>;

    /// Options of a poll ordered by id.
    async fn list_options(&self, poll: PollId) -> MusterResult<Vec<PollOption>>;

    /// Delete every option not in `keep` together with votes pointing at them.
    /// Returns the number of options removed.
    async fn retain_options(&self, poll: PollId, keep: &[OptionId]) -> MusterResult<usize>;

    /// Record `vote`, replacing the user's previous vote. Returns the replaced option.
    async fn upsert_vote(&self, vote: Vote) -> MusterResult<Option<OptionId>>;

    /// The user's live vote, if any.
    async fn get_vote(&self, poll: PollId, user: &UserId) -> MusterResult<Option<OptionId>>;

    /// All live votes of a poll.
    async fn list_votes(&self, poll: PollId) -> MusterResult<Vec<Vote>>;

    /// Delete every vote of a poll. Returns the number removed.
    async fn clear_votes(&self, poll: PollId) -> MusterResult<usize>;
}
