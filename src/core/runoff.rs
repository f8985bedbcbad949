//! Runoff controller: restricts a tied poll to its finalists and restarts voting.
//!
//! Triggered by the reconciler once a poll's deadline has passed with a tie:
//! every non-finalist option is removed (with its votes), all remaining votes are
//! cleared, and the deadline moves to `now + window`. The poll stays open, so a
//! renewed tie at the new deadline runs the same procedure again.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::MusterConfig;
use crate::core::audit::{build_audit_event, EntityKind, SharedAuditSink};
use crate::core::ballot::{PollEngine, Tally};
use crate::core::error::{MusterError, MusterResult};
use crate::core::model::{Poll, PollOption};
use crate::core::render;
use crate::infra::notify::Notifier;
use crate::infra::store::PollStore;
use crate::util::ids::{OptionId, PollId};
use crate::util::locks::EntityLocks;

/// Outcome of a runoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runoff {
    /// Poll put into runoff.
    pub poll: PollId,
    /// Tied options kept for the runoff, in id order.
    pub finalists: Vec<PollOption>,
    /// Options removed because they were not tied for the lead.
    pub removed_options: usize,
    /// Votes discarded, including those for finalists.
    pub cleared_votes: usize,
    /// New deadline.
    pub deadline: DateTime<Utc>,
    /// Whether the announcement reached the notifier.
    pub announced: bool,
}

/// Runoff controller sharing the poll locks of a [`PollEngine`].
pub struct RunoffController<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: Arc<MusterConfig>,
    locks: Arc<EntityLocks<PollId>>,
    audit: Option<SharedAuditSink>,
    window: Duration,
}

impl<S, N> RunoffController<S, N>
where
    S: PollStore,
    N: Notifier,
{
    /// Build a controller bound to `engine`, with the configured runoff window.
    pub fn for_engine(engine: &PollEngine<S, N>) -> Self {
        Self {
            store: Arc::clone(engine.store()),
            notifier: Arc::clone(engine.notifier()),
            config: Arc::clone(engine.config()),
            locks: Arc::clone(engine.locks()),
            audit: engine.audit().cloned(),
            window: engine.config().reconciler.runoff_window(),
        }
    }

    /// Override the runoff window.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Runoff length.
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Start a runoff if the poll is open and currently tied.
    ///
    /// Returns `None` when there is nothing to do.
    pub async fn run(&self, id: PollId, now: DateTime<Utc>) -> MusterResult<Option<Runoff>> {
        let guard = self.locks.acquire(&id).await;
        let poll = self
            .store
            .get_poll(id)
            .await?
            .ok_or_else(|| MusterError::NotFound(format!("poll {id}")))?;
        if !poll.is_open() {
            return Ok(None);
        }
        let options = self.store.list_options(id).await?;
        let votes = self.store.list_votes(id).await?;
        let tally = Tally::new(options, &votes);
        let Some(tied) = tally.tied() else {
            return Ok(None);
        };
        let finalists: Vec<PollOption> = tied.into_iter().map(|e| e.option.clone()).collect();
        let mut runoff = self.apply(&poll, finalists, now).await?;
        drop(guard);
        runoff.announced = self.announce(&poll, &runoff).await;
        Ok(Some(runoff))
    }

    /// Prune to `finalists`, clear votes, and extend the deadline.
    /// Caller holds the poll lock and has established the tie.
    pub(crate) async fn apply(
        &self,
        poll: &Poll,
        finalists: Vec<PollOption>,
        now: DateTime<Utc>,
    ) -> MusterResult<Runoff> {
        let keep: Vec<OptionId> = finalists.iter().map(|o| o.id).collect();
        let removed_options = self.store.retain_options(poll.id, &keep).await?;
        let cleared_votes = self.store.clear_votes(poll.id).await?;
        let deadline = now + self.window;
        self.store.set_poll_deadline(poll.id, deadline).await?;

        let names = finalists
            .iter()
            .map(|o| o.title.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(
            "poll {} tied between {}; runoff until {} ({} options removed, {} votes cleared)",
            poll.id,
            names,
            deadline,
            removed_options,
            cleared_votes
        );
        if let Some(audit) = &self.audit {
            audit.lock().record(build_audit_event(
                EntityKind::Poll,
                poll.id,
                "runoff",
                None,
                now,
                Some(names),
            ));
        }

        Ok(Runoff {
            poll: poll.id,
            finalists,
            removed_options,
            cleared_votes,
            deadline,
            announced: false,
        })
    }

    /// Update the card and post the runoff announcement. Returns whether the post went out.
    pub(crate) async fn announce(&self, poll: &Poll, runoff: &Runoff) -> bool {
        let polls = &self.config.channels.polls;
        let minutes = self.window.num_minutes();

        if let Some(message) = &poll.message {
            let mut extended = poll.clone();
            extended.deadline = runoff.deadline;
            let tally = Tally::new(runoff.finalists.clone(), &[]);
            let offset = render::offset_or_utc(self.config.display_offset());
            let card = render::runoff_card(&extended, &tally, offset, minutes);
            if let Err(e) = self.notifier.edit_message(polls, message, &card).await {
                tracing::warn!("poll {} runoff card not updated: {}", poll.id, e);
            }
        }

        let content = render::runoff_announcement(
            poll,
            runoff.finalists.iter().map(|o| o.title.as_str()),
            minutes,
            self.config.channels.poll_role.as_deref(),
        );
        match self.notifier.notify(polls, &content).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("poll {} runoff not announced: {}", poll.id, e);
                false
            }
        }
    }
}
