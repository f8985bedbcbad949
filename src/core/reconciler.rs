//! Periodic reconciliation of events and polls against the clock.
//!
//! One tick performs, in order:
//!
//! 1. **Reminders**: planned events starting within the reminder window get a
//!    reminder naming the participants, then their status flipped to `Notified`.
//!    A failed send leaves the event `Planned` and is retried on the next tick.
//! 2. **Event cards**: cards of events starting around now are re-rendered with the
//!    current display status. Failures are ignored per item.
//! 3. **Polls**: open polls past their deadline are settled. A tie starts a runoff;
//!    anything else closes the poll and announces the winner.
//! 4. **Poll card**: the latest open poll's card is re-rendered.
//!
//! Each item is processed on its own; a failing item is logged and counted, and the
//! rest of the tick continues. Only a failing store query aborts the tick.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::MusterConfig;
use crate::core::ballot::{Closure, PollEngine};
use crate::core::error::MusterResult;
use crate::core::model::{EventStatus, PollOption};
use crate::core::roster::RosterManager;
use crate::core::runoff::{Runoff, RunoffController};
use crate::infra::notify::Notifier;
use crate::infra::store::{EventStore, PollStore};
use crate::util::clock::Clock;
use crate::util::ids::{EventId, PollId};

/// What a tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Another tick was still running; nothing was done.
    pub skipped: bool,
    /// Events reminded and flipped to `Notified`.
    pub reminded: Vec<EventId>,
    /// Event cards re-rendered.
    pub refreshed_events: usize,
    /// Polls closed with a result.
    pub closed: Vec<PollId>,
    /// Polls put into runoff.
    pub runoffs: Vec<PollId>,
    /// Items whose processing or announcement failed.
    pub failures: usize,
}

impl TickReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Whether the tick changed any state.
    pub fn is_idle(&self) -> bool {
        self.reminded.is_empty() && self.closed.is_empty() && self.runoffs.is_empty()
    }
}

/// How an overdue poll was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Closed with (or without) a winner.
    Closed(Closure),
    /// Tied; restricted to finalists with a new deadline.
    Runoff(Runoff),
    /// Already closed, or not due any more.
    Skipped,
}

/// Periodic driver for reminders, card refreshes, closures, and runoffs.
pub struct Reconciler<S, N> {
    roster: Arc<RosterManager<S, N>>,
    polls: Arc<PollEngine<S, N>>,
    runoff: RunoffController<S, N>,
    clock: Arc<dyn Clock>,
    config: Arc<MusterConfig>,
    in_flight: AsyncMutex<()>,
}

impl<S, N> Reconciler<S, N>
where
    S: EventStore + PollStore,
    N: Notifier,
{
    /// Build a reconciler driving the given managers.
    pub fn new(
        roster: Arc<RosterManager<S, N>>,
        polls: Arc<PollEngine<S, N>>,
        clock: Arc<dyn Clock>,
        config: Arc<MusterConfig>,
    ) -> Self {
        let runoff = RunoffController::for_engine(&polls);
        Self {
            roster,
            polls,
            runoff,
            clock,
            config,
            in_flight: AsyncMutex::new(()),
        }
    }

    /// Replace the runoff controller, e.g. to change its window.
    #[must_use]
    pub fn with_runoff(mut self, runoff: RunoffController<S, N>) -> Self {
        self.runoff = runoff;
        self
    }

    /// Run one reconciliation pass at the current clock reading.
    ///
    /// Returns a skipped report when a previous pass is still in flight.
    pub async fn tick(&self) -> MusterResult<TickReport> {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            tracing::warn!("reconcile tick skipped: previous tick still running");
            return Ok(TickReport::skipped());
        };
        let now = self.clock.now();
        let mut report = TickReport::default();

        self.remind_upcoming(now, &mut report).await?;
        self.refresh_event_cards(now, &mut report).await?;
        self.settle_due_polls(now, &mut report).await?;
        self.refresh_open_poll().await;

        self.roster.prune_locks();
        self.polls.prune_locks();

        if report.is_idle() {
            tracing::trace!("reconcile tick at {} idle", now);
        } else {
            tracing::info!(
                "reconcile tick at {}: {} reminded, {} closed, {} runoffs, {} failures",
                now,
                report.reminded.len(),
                report.closed.len(),
                report.runoffs.len(),
                report.failures
            );
        }
        Ok(report)
    }

    async fn remind_upcoming(&self, now: DateTime<Utc>, report: &mut TickReport) -> MusterResult<()> {
        let (from, to) = self.config.reconciler.reminder_window();
        let due = self
            .roster
            .store()
            .events_due_for_reminder(now + from, now + to)
            .await?;

        for event in due {
            if event.participants.is_empty() {
                tracing::debug!("event {} due for reminder but has no participants", event.id);
                continue;
            }
            match self.remind(event.id).await {
                Ok(true) => report.reminded.push(event.id),
                Ok(false) => {}
                Err(e) => {
                    report.failures += 1;
                    tracing::error!("reminder for event {} failed: {}", event.id, e);
                }
            }
        }
        Ok(())
    }

    /// Send the reminder for a planned event, then flip it to `Notified`.
    ///
    /// Returns `false` when the event no longer qualifies (already notified or
    /// finished, or the roster emptied in the meantime). A failed send leaves the
    /// event `Planned`, so the next tick retries it while it is still in the window.
    pub async fn remind(&self, id: EventId) -> MusterResult<bool> {
        let _guard = self.roster.lock(id).await;
        let event = self.roster.get_event(id).await?;
        if event.status != EventStatus::Planned || event.participants.is_empty() {
            return Ok(false);
        }
        self.roster.send_reminder(&event).await?;
        self.roster.mark_notified(&event).await?;
        tracing::info!("event {} reminder for {} participants", id, event.participants.len());
        Ok(true)
    }

    async fn refresh_event_cards(&self, now: DateTime<Utc>, report: &mut TickReport) -> MusterResult<()> {
        let (back, ahead) = self.config.reconciler.refresh_window();
        let events = self
            .roster
            .store()
            .events_starting_between(now - back, now + ahead, self.config.reconciler.refresh_batch_limit)
            .await?;

        for event in events.iter().filter(|e| e.message.is_some()) {
            match self.roster.render_card(event, now).await {
                Ok(true) => report.refreshed_events += 1,
                Ok(false) => {}
                Err(e) => tracing::debug!("event {} card refresh failed: {}", event.id, e),
            }
        }
        Ok(())
    }

    async fn settle_due_polls(&self, now: DateTime<Utc>, report: &mut TickReport) -> MusterResult<()> {
        let due = self.polls.store().overdue_polls(now).await?;

        for poll in due {
            match self.settle_poll(poll.id, now).await {
                Ok(Settlement::Closed(closure)) => {
                    if !closure.announced {
                        report.failures += 1;
                    }
                    report.closed.push(closure.poll);
                }
                Ok(Settlement::Runoff(runoff)) => {
                    if !runoff.announced {
                        report.failures += 1;
                    }
                    report.runoffs.push(runoff.poll);
                }
                Ok(Settlement::Skipped) => {}
                Err(e) => {
                    report.failures += 1;
                    tracing::error!("settling poll {} failed: {}", poll.id, e);
                }
            }
        }
        Ok(())
    }

    /// Settle one poll whose deadline has passed: runoff on a tie, closure otherwise.
    pub async fn settle_poll(&self, id: PollId, now: DateTime<Utc>) -> MusterResult<Settlement> {
        let guard = self.polls.lock(id).await;
        let poll = self.polls.get_poll(id).await?;
        if !poll.is_open() || poll.deadline > now {
            return Ok(Settlement::Skipped);
        }
        let tally = self.polls.tally_unchecked(id).await?;

        if let Some(tied) = tally.tied() {
            let finalists: Vec<PollOption> = tied.into_iter().map(|e| e.option.clone()).collect();
            let mut runoff = self.runoff.apply(&poll, finalists, now).await?;
            drop(guard);
            runoff.announced = self.runoff.announce(&poll, &runoff).await;
            return Ok(Settlement::Runoff(runoff));
        }

        let winner = self.polls.mark_closed(&poll, &tally).await?;
        drop(guard);
        Ok(Settlement::Closed(
            self.polls.announce_closure(&poll, &tally, winner).await,
        ))
    }

    async fn refresh_open_poll(&self) {
        let latest = match self.polls.latest_open_poll().await {
            Ok(Some(poll)) => poll,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("latest open poll lookup failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.polls.refresh_card(latest.id).await {
            tracing::debug!("poll {} card refresh failed: {}", latest.id, e);
        }
    }
}
