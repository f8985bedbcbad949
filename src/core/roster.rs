//! Event roster manager: capacity-bounded join and leave, manual stop, and event cards.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::config::MusterConfig;
use crate::core::audit::{build_audit_event, EntityKind, SharedAuditSink};
use crate::core::error::{MusterError, MusterResult};
use crate::core::model::{Event, EventStatus, Membership, RosterCounts};
use crate::core::render;
use crate::core::status::{self, DisplayStatus};
use crate::infra::notify::Notifier;
use crate::infra::store::EventStore;
use crate::util::clock::Clock;
use crate::util::ids::{EventId, UserId};
use crate::util::locks::EntityLocks;

/// Roster manager.
///
/// Join and leave are read-check-write sequences; each runs under the event's
/// entity lock so concurrent joins can never push the roster past capacity.
pub struct RosterManager<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    config: Arc<MusterConfig>,
    locks: EntityLocks<EventId>,
    audit: Option<SharedAuditSink>,
}

impl<S, N> RosterManager<S, N>
where
    S: EventStore,
    N: Notifier,
{
    /// Create a manager over the given collaborators.
    pub fn new(store: Arc<S>, notifier: Arc<N>, clock: Arc<dyn Clock>, config: Arc<MusterConfig>) -> Self {
        Self {
            store,
            notifier,
            clock,
            config,
            locks: EntityLocks::new(),
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) async fn lock(&self, id: EventId) -> OwnedMutexGuard<()> {
        self.locks.acquire(&id).await
    }

    pub(crate) fn prune_locks(&self) -> usize {
        self.locks.prune_idle()
    }

    /// Create a planned event and publish its card to the events channel.
    ///
    /// A failed publish, or a failure to record the published card, is logged and
    /// leaves the event without a card.
    pub async fn create_event(
        &self,
        title: &str,
        description: &str,
        capacity: usize,
        starts_at: DateTime<Utc>,
    ) -> MusterResult<Event> {
        let title = title.trim();
        if title.is_empty() {
            return Err(MusterError::Invalid("event title must not be empty".into()));
        }
        if capacity == 0 {
            return Err(MusterError::Invalid("capacity must be greater than 0".into()));
        }

        let mut event = Event::new(title, description.trim(), capacity, starts_at);
        self.store.insert_event(event.clone()).await?;
        self.record(event.id, "create", None, Some(format!("capacity {capacity}")));
        tracing::info!("created event {} '{}' starting at {}", event.id, event.title, event.starts_at);

        let card = render::event_card(&event, self.display_status(&event), self.display_offset());
        match self.notifier.notify(&self.config.channels.events, &card).await {
            Ok(message) => match self.store.set_event_message(event.id, message.clone()).await {
                Ok(()) => event.message = Some(message),
                Err(e) => tracing::warn!("event {} card {} sent but not recorded: {}", event.id, message, e),
            },
            Err(e) => tracing::warn!("event {} card not published: {}", event.id, e),
        }
        Ok(event)
    }

    /// Fetch an event or fail with `NotFound`.
    pub async fn get_event(&self, id: EventId) -> MusterResult<Event> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| MusterError::NotFound(format!("event {id}")))
    }

    /// Add `user` to the roster.
    ///
    /// Joining twice is a successful no-op. A full roster fails with
    /// [`MusterError::Full`] carrying the unchanged counts.
    pub async fn join(&self, id: EventId, user: UserId) -> MusterResult<RosterCounts> {
        let _guard = self.lock(id).await;
        let mut event = self.get_event(id).await?;
        if event.participants.contains(&user) {
            return Ok(event.counts());
        }
        if event.is_full() {
            let counts = event.counts();
            tracing::debug!("event {} full, rejected {}", id, user);
            return Err(MusterError::Full {
                current: counts.current,
                capacity: counts.capacity,
            });
        }

        event.participants.insert(user.clone());
        self.store.set_participants(id, event.participants.clone()).await?;
        let counts = event.counts();
        self.record(id, "join", Some(user.0), Some(format!("{}/{}", counts.current, counts.capacity)));
        Ok(counts)
    }

    /// Remove `user` from the roster. Leaving without being listed is a successful no-op.
    pub async fn leave(&self, id: EventId, user: UserId) -> MusterResult<RosterCounts> {
        let _guard = self.lock(id).await;
        let mut event = self.get_event(id).await?;
        if !event.participants.remove(&user) {
            return Ok(event.counts());
        }

        self.store.set_participants(id, event.participants.clone()).await?;
        let counts = event.counts();
        self.record(id, "leave", Some(user.0), Some(format!("{}/{}", counts.current, counts.capacity)));
        Ok(counts)
    }

    /// Leave when listed, join otherwise.
    pub async fn toggle(&self, id: EventId, user: UserId) -> MusterResult<(Membership, RosterCounts)> {
        let listed = self.get_event(id).await?.participants.contains(&user);
        if listed {
            Ok((Membership::Left, self.leave(id, user).await?))
        } else {
            Ok((Membership::Joined, self.join(id, user).await?))
        }
    }

    /// Current participants.
    pub async fn participants(&self, id: EventId) -> MusterResult<Vec<UserId>> {
        Ok(self.get_event(id).await?.participants.into_iter().collect())
    }

    /// Stop an event by hand. Planned and notified events move to `Finished`;
    /// finishing twice is a no-op. The card is edited to list the final roster.
    pub async fn finish(&self, id: EventId) -> MusterResult<Event> {
        let mut event = {
            let _guard = self.lock(id).await;
            let mut event = self.get_event(id).await?;
            if !event.status.can_advance_to(EventStatus::Finished) {
                return Ok(event);
            }
            self.store.set_event_status(id, EventStatus::Finished).await?;
            event.status = EventStatus::Finished;
            event
        };
        self.record(id, "finish", None, Some(format!("{} participants", event.participants.len())));
        tracing::info!("event {} finished", id);

        if let Some(message) = event.message.take() {
            let card = render::finished_event_card(&event, self.display_offset());
            if let Err(e) = self
                .notifier
                .edit_message(&self.config.channels.events, &message, &card)
                .await
            {
                tracing::warn!("event {} final card not updated: {}", id, e);
            }
            event.message = Some(message);
        }
        Ok(event)
    }

    /// Display status at the current clock reading.
    pub fn display_status(&self, event: &Event) -> DisplayStatus {
        status::resolve(self.clock.now(), event.starts_at, event.status)
    }

    /// Re-render the card of an event. Returns whether a card was edited.
    pub async fn refresh_card(&self, id: EventId) -> MusterResult<bool> {
        let event = self.get_event(id).await?;
        self.render_card(&event, self.clock.now()).await
    }

    pub(crate) async fn render_card(&self, event: &Event, now: DateTime<Utc>) -> MusterResult<bool> {
        let Some(message) = &event.message else {
            return Ok(false);
        };
        let offset = self.display_offset();
        let card = match event.status {
            EventStatus::Finished => render::finished_event_card(event, offset),
            _ => render::event_card(event, status::resolve(now, event.starts_at, event.status), offset),
        };
        self.notifier
            .edit_message(&self.config.channels.events, message, &card)
            .await?;
        Ok(true)
    }

    /// Move a planned event to `Notified`; caller holds the event lock.
    pub(crate) async fn mark_notified(&self, event: &Event) -> MusterResult<()> {
        self.store.set_event_status(event.id, EventStatus::Notified).await?;
        self.record(
            event.id,
            "remind",
            None,
            Some(format!("{} participants", event.participants.len())),
        );
        Ok(())
    }

    /// Send the reminder for an event.
    pub(crate) async fn send_reminder(&self, event: &Event) -> MusterResult<()> {
        let content = render::reminder(event);
        self.notifier
            .notify(&self.config.channels.reminders, &content)
            .await
            .map(|_| ())
    }

    fn display_offset(&self) -> chrono::FixedOffset {
        render::offset_or_utc(self.config.display_offset())
    }

    fn record(&self, id: EventId, action: &str, actor: Option<String>, detail: Option<String>) {
        if let Some(audit) = &self.audit {
            audit.lock().record(build_audit_event(
                EntityKind::Event,
                id,
                action,
                actor,
                self.clock.now(),
                detail,
            ));
        }
    }
}
