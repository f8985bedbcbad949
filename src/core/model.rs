//! Entities managed by the core: events, polls, options, and votes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::ids::{EventId, MessageId, OptionId, PollId, UserId};

/// Persisted lifecycle of an event.
///
/// Transitions only move forward: `Planned -> Notified -> Finished`, or straight to
/// `Finished` on a manual stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created, reminder not yet sent.
    Planned,
    /// Reminder dispatched.
    Notified,
    /// Stopped manually; terminal.
    Finished,
}

impl EventStatus {
    /// Whether moving to `next` respects the forward-only ordering.
    pub fn can_advance_to(self, next: Self) -> bool {
        next > self
    }
}

/// A capacity-bounded roster attached to a start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier.
    pub id: EventId,
    /// Display title.
    pub title: String,
    /// Free-form description, possibly empty.
    pub description: String,
    /// Maximum roster size, fixed at creation.
    pub capacity: usize,
    /// Current participants.
    pub participants: BTreeSet<UserId>,
    /// Persisted lifecycle status.
    pub status: EventStatus,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Published card, if the notifier accepted it.
    pub message: Option<MessageId>,
}

impl Event {
    /// Build a fresh `Planned` event with an empty roster.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        capacity: usize,
        starts_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            title: title.into(),
            description: description.into(),
            capacity,
            participants: BTreeSet::new(),
            status: EventStatus::Planned,
            starts_at,
            message: None,
        }
    }

    /// Current and maximum roster size.
    pub fn counts(&self) -> RosterCounts {
        RosterCounts {
            current: self.participants.len(),
            capacity: self.capacity,
        }
    }

    /// Whether no seats remain.
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity
    }
}

/// Roster occupancy returned by join/leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterCounts {
    /// Participants after the operation.
    pub current: usize,
    /// Fixed capacity.
    pub capacity: usize,
}

/// Outcome of a toggle: which way the membership flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// The user was added.
    Joined,
    /// The user was removed.
    Left,
}

/// Persisted lifecycle of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    /// Accepting options and votes.
    Open,
    /// Settled; terminal.
    Closed,
}

/// A deadline-bounded ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    /// Unique identifier.
    pub id: PollId,
    /// Display title.
    pub title: String,
    /// Free-form description, possibly empty.
    pub description: String,
    /// Lifecycle status.
    pub status: PollStatus,
    /// Voting ends at this instant; extended by runoffs.
    pub deadline: DateTime<Utc>,
    /// Creation instant, used to find the latest open poll.
    pub created_at: DateTime<Utc>,
    /// Published card, if the notifier accepted it.
    pub message: Option<MessageId>,
}

impl Poll {
    /// Build a fresh open poll.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        deadline: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PollId::new(),
            title: title.into(),
            description: description.into(),
            status: PollStatus::Open,
            deadline,
            created_at,
            message: None,
        }
    }

    /// Whether options and votes are accepted.
    pub fn is_open(&self) -> bool {
        self.status == PollStatus::Open
    }
}

/// A candidate answer within a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    /// Sequential id within the poll; also the tie-break rank.
    pub id: OptionId,
    /// Owning poll.
    pub poll: PollId,
    /// Trimmed title.
    pub title: String,
    /// Optional reference link.
    pub link: Option<String>,
    /// Who proposed it, when known.
    pub proposer: Option<UserId>,
}

/// Option fields supplied by the caller; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOption {
    /// Trimmed title.
    pub title: String,
    /// Optional link, already trimmed and non-empty.
    pub link: Option<String>,
    /// Proposer, when known.
    pub proposer: Option<UserId>,
}

/// The single live vote of a user in a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Poll voted in.
    pub poll: PollId,
    /// Voter.
    pub user: UserId,
    /// Chosen option.
    pub option: OptionId,
}
