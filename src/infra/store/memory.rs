//! In-memory store with optional snapshot persistence.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::snapshot::{PollSnapshot, StoreSnapshot};
use super::{EventStore, PollStore};
use crate::core::error::{MusterError, MusterResult};
use crate::core::model::{Event, EventStatus, NewOption, Poll, PollOption, PollStatus, Vote};
use crate::util::ids::{EventId, MessageId, OptionId, PollId, UserId};

#[derive(Clone)]
struct PollRecord {
    poll: Poll,
    options: BTreeMap<OptionId, PollOption>,
    votes: HashMap<UserId, OptionId>,
    next_option: u64,
}

impl PollRecord {
    fn new(poll: Poll) -> Self {
        Self {
            poll,
            options: BTreeMap::new(),
            votes: HashMap::new(),
            next_option: 1,
        }
    }
}

#[derive(Clone, Default)]
struct StoreState {
    events: HashMap<EventId, Event>,
    polls: HashMap<PollId, PollRecord>,
}

impl StoreState {
    fn event_mut(&mut self, id: EventId) -> MusterResult<&mut Event> {
        self.events
            .get_mut(&id)
            .ok_or_else(|| MusterError::NotFound(format!("event {id}")))
    }

    fn poll_mut(&mut self, id: PollId) -> MusterResult<&mut PollRecord> {
        self.polls
            .get_mut(&id)
            .ok_or_else(|| MusterError::NotFound(format!("poll {id}")))
    }

    fn poll(&self, id: PollId) -> MusterResult<&PollRecord> {
        self.polls
            .get(&id)
            .ok_or_else(|| MusterError::NotFound(format!("poll {id}")))
    }

    fn to_snapshot(&self) -> StoreSnapshot {
        let mut events: Vec<Event> = self.events.values().cloned().collect();
        events.sort_by_key(|e| (e.starts_at, e.id));
        let mut polls: Vec<PollSnapshot> = self
            .polls
            .values()
            .map(|r| {
                let mut votes: Vec<Vote> = r
                    .votes
                    .iter()
                    .map(|(user, option)| Vote {
                        poll: r.poll.id,
                        user: user.clone(),
                        option: *option,
                    })
                    .collect();
                votes.sort_by(|a, b| a.user.cmp(&b.user));
                PollSnapshot {
                    poll: r.poll.clone(),
                    options: r.options.values().cloned().collect(),
                    votes,
                    next_option: r.next_option,
                }
            })
            .collect();
        polls.sort_by_key(|p| (p.poll.created_at, p.poll.id));
        StoreSnapshot { events, polls }
    }

    fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let events = snapshot.events.into_iter().map(|e| (e.id, e)).collect();
        let polls = snapshot
            .polls
            .into_iter()
            .map(|p| {
                let id = p.poll.id;
                let next_from_options = p.options.iter().map(|o| o.id.0 + 1).max().unwrap_or(1);
                let record = PollRecord {
                    poll: p.poll,
                    options: p.options.into_iter().map(|o| (o.id, o)).collect(),
                    votes: p.votes.into_iter().map(|v| (v.user, v.option)).collect(),
                    next_option: p.next_option.max(next_from_options),
                };
                (id, record)
            })
            .collect();
        Self { events, polls }
    }
}

/// Mutex-guarded in-memory store.
///
/// Opened with [`InMemoryStore::open`], every mutation is also written to a JSON
/// snapshot so state survives a restart. A mutation becomes visible only once its
/// snapshot is saved; a failed save leaves the state as it was.
/// [`InMemoryStore::set_available`] simulates an outage: while unavailable every
/// call fails with [`MusterError::Storage`].
///
/// File-backed mode rewrites the whole snapshot with blocking I/O while holding the
/// state lock, so every mutation costs a full serialization. It suits development
/// and small single-instance deployments; larger ones should implement
/// [`EventStore`] and [`PollStore`] over a database.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    path: Option<PathBuf>,
    available: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty, non-persistent store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            path: None,
            available: AtomicBool::new(true),
        }
    }

    /// Open a store persisted at `path`, loading the existing snapshot if present.
    ///
    /// Meant for development and small deployments; see the type docs for the cost
    /// of each write.
    pub fn open(path: impl AsRef<Path>) -> MusterResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = StoreSnapshot::load(&path)?
            .map(StoreState::from_snapshot)
            .unwrap_or_default();
        tracing::info!(
            "opened store at {} ({} events, {} polls)",
            path.display(),
            state.events.len(),
            state.polls.len()
        );
        Ok(Self {
            state: Mutex::new(state),
            path: Some(path),
            available: AtomicBool::new(true),
        })
    }

    /// Toggle simulated availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Copy of the full state.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().to_snapshot()
    }

    fn check_available(&self) -> MusterResult<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(MusterError::Storage("store unavailable".into()))
        }
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> MusterResult<T>) -> MusterResult<T> {
        self.check_available()?;
        let state = self.state.lock();
        f(&state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> MusterResult<T>) -> MusterResult<T> {
        self.check_available()?;
        let mut state = self.state.lock();
        let Some(path) = &self.path else {
            return f(&mut state);
        };
        let mut next = state.clone();
        let out = f(&mut next)?;
        next.to_snapshot().save(path)?;
        *state = next;
        Ok(out)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn insert_event(&self, event: Event) -> MusterResult<()> {
        self.write(|s| {
            if s.events.contains_key(&event.id) {
                return Err(MusterError::Storage(format!("event {} already exists", event.id)));
            }
            s.events.insert(event.id, event);
            Ok(())
        })
    }

    async fn get_event(&self, id: EventId) -> MusterResult<Option<Event>> {
        self.read(|s| Ok(s.events.get(&id).cloned()))
    }

    async fn set_participants(&self, id: EventId, participants: BTreeSet<UserId>) -> MusterResult<()> {
        self.write(|s| {
            s.event_mut(id)?.participants = participants;
            Ok(())
        })
    }

    async fn set_event_status(&self, id: EventId, status: EventStatus) -> MusterResult<()> {
        self.write(|s| {
            s.event_mut(id)?.status = status;
            Ok(())
        })
    }

    async fn set_event_message(&self, id: EventId, message: MessageId) -> MusterResult<()> {
        self.write(|s| {
            s.event_mut(id)?.message = Some(message);
            Ok(())
        })
    }

    async fn events_due_for_reminder(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> MusterResult<Vec<Event>> {
        self.read(|s| {
            let mut due: Vec<Event> = s
                .events
                .values()
                .filter(|e| e.status == EventStatus::Planned && e.starts_at >= from && e.starts_at <= to)
                .cloned()
                .collect();
            due.sort_by_key(|e| e.starts_at);
            Ok(due)
        })
    }

    async fn events_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> MusterResult<Vec<Event>> {
        self.read(|s| {
            let mut found: Vec<Event> = s
                .events
                .values()
                .filter(|e| e.starts_at >= from && e.starts_at <= to)
                .cloned()
                .collect();
            found.sort_by_key(|e| e.starts_at);
            found.truncate(limit);
            Ok(found)
        })
    }
}

#[async_trait]
impl PollStore for InMemoryStore {
    async fn insert_poll(&self, poll: Poll) -> MusterResult<()> {
        self.write(|s| {
            if s.polls.contains_key(&poll.id) {
                return Err(MusterError::Storage(format!("poll {} already exists", poll.id)));
            }
            s.polls.insert(poll.id, PollRecord::new(poll));
            Ok(())
        })
    }

    async fn get_poll(&self, id: PollId) -> MusterResult<Option<Poll>> {
        self.read(|s| Ok(s.polls.get(&id).map(|r| r.poll.clone())))
    }

    async fn set_poll_status(&self, id: PollId, status: PollStatus) -> MusterResult<()> {
        self.write(|s| {
            s.poll_mut(id)?.poll.status = status;
            Ok(())
        })
    }

    async fn set_poll_deadline(&self, id: PollId, deadline: DateTime<Utc>) -> MusterResult<()> {
        self.write(|s| {
            s.poll_mut(id)?.poll.deadline = deadline;
            Ok(())
        })
    }

    async fn set_poll_message(&self, id: PollId, message: MessageId) -> MusterResult<()> {
        self.write(|s| {
            s.poll_mut(id)?.poll.message = Some(message);
            Ok(())
        })
    }

    async fn overdue_polls(&self, now: DateTime<Utc>) -> MusterResult<Vec<Poll>> {
        self.read(|s| {
            let mut due: Vec<Poll> = s
                .polls
                .values()
                .filter(|r| r.poll.status == PollStatus::Open && r.poll.deadline <= now)
                .map(|r| r.poll.clone())
                .collect();
            due.sort_by_key(|p| p.deadline);
            Ok(due)
        })
    }

    async fn latest_open_poll(&self) -> MusterResult<Option<Poll>> {
        self.read(|s| {
            Ok(s.polls
                .values()
                .filter(|r| r.poll.status == PollStatus::Open)
                .max_by_key(|r| r.poll.created_at)
                .map(|r| r.poll.clone()))
        })
    }

    async fn insert_option(&self, poll: PollId, option: NewOption) -> MusterResult<PollOption> {
        self.write(|s| {
            let record = s.poll_mut(poll)?;
            let id = OptionId(record.next_option);
            record.next_option += 1;
            let stored = PollOption {
                id,
                poll,
                title: option.title,
                link: option.link,
                proposer: option.proposer,
            };
            record.options.insert(id, stored.clone());
            Ok(stored)
        })
    }

    async fn list_options(&self, poll: PollId) -> MusterResult<Vec<PollOption>> {
        self.read(|s| Ok(s.poll(poll)?.options.values().cloned().collect()))
    }

    async fn retain_options(&self, poll: PollId, keep: &[OptionId]) -> MusterResult<usize> {
        self.write(|s| {
            let record = s.poll_mut(poll)?;
            let before = record.options.len();
            record.options.retain(|id, _| keep.contains(id));
            let options = &record.options;
            record.votes.retain(|_, option| options.contains_key(option));
            Ok(before - record.options.len())
        })
    }

    async fn upsert_vote(&self, vote: Vote) -> MusterResult<Option<OptionId>> {
        self.write(|s| {
            let record = s.poll_mut(vote.poll)?;
            if !record.options.contains_key(&vote.option) {
                return Err(MusterError::NotFound(format!("option {} in poll {}", vote.option, vote.poll)));
            }
            Ok(record.votes.insert(vote.user, vote.option))
        })
    }

    async fn get_vote(&self, poll: PollId, user: &UserId) -> MusterResult<Option<OptionId>> {
        self.read(|s| Ok(s.poll(poll)?.votes.get(user).copied()))
    }

    async fn list_votes(&self, poll: PollId) -> MusterResult<Vec<Vote>> {
        self.read(|s| {
            let record = s.poll(poll)?;
            Ok(record
                .votes
                .iter()
                .map(|(user, option)| Vote {
                    poll,
                    user: user.clone(),
                    option: *option,
                })
                .collect())
        })
    }

    async fn clear_votes(&self, poll: PollId) -> MusterResult<usize> {
        self.write(|s| {
            let record = s.poll_mut(poll)?;
            let removed = record.votes.len();
            record.votes.clear();
            Ok(removed)
        })
    }
}
