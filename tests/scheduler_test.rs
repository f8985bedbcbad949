//! Tests for tick exclusion and the background scheduler.

mod support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use muster::config::MusterConfig;
use muster::core::{EventStatus, MusterResult, PollEngine, Reconciler, RosterManager};
use muster::infra::{EventStore, InMemoryNotifier, InMemoryStore, Notifier};
use muster::runtime::{Scheduler, TokioSpawner};
use muster::util::{ChannelId, Clock, ManualClock, MessageId};
use support::{t0, Harness};
use tokio::sync::watch;

/// Notifier whose sends wait until the gate is opened.
struct GatedNotifier {
    inner: InMemoryNotifier,
    gate: watch::Sender<bool>,
    waiting: AtomicBool,
}

impl GatedNotifier {
    fn closed() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner: InMemoryNotifier::new(),
            gate,
            waiting: AtomicBool::new(false),
        }
    }

    fn open(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl Notifier for GatedNotifier {
    async fn notify(&self, channel: &ChannelId, content: &str) -> MusterResult<MessageId> {
        let mut rx = self.gate.subscribe();
        self.waiting.store(true, Ordering::SeqCst);
        let _ = rx.wait_for(|open| *open).await;
        self.inner.notify(channel, content).await
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &str,
    ) -> MusterResult<()> {
        self.inner.edit_message(channel, message, content).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_tick_is_skipped() {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(GatedNotifier::closed());
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(t0()));
    let config = Arc::new(MusterConfig::default());

    let roster = Arc::new(RosterManager::new(
        store.clone(),
        notifier.clone(),
        clock.clone(),
        config.clone(),
    ));
    let polls = Arc::new(PollEngine::new(
        store.clone(),
        notifier.clone(),
        clock.clone(),
        config.clone(),
    ));
    let reconciler = Arc::new(Reconciler::new(roster.clone(), polls, clock, config));

    // Card publishing goes through the gate as well.
    notifier.open();
    let event = roster
        .create_event("Raid", "", 5, t0() + Duration::minutes(5))
        .await
        .unwrap();
    roster.join(event.id, "alice".into()).await.unwrap();
    notifier.gate.send_replace(false);
    notifier.waiting.store(false, Ordering::SeqCst);

    let first = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.tick().await })
    };

    tokio::time::timeout(StdDuration::from_secs(5), async {
        while !notifier.waiting.load(Ordering::SeqCst) {
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
    })
    .await
    .expect("first tick reached the reminder send");

    // The send is blocked, so the event is still planned.
    let current = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(current.status, EventStatus::Planned);

    let second = reconciler.tick().await.unwrap();
    assert!(second.skipped);
    assert!(second.reminded.is_empty());

    notifier.open();
    let first = first.await.unwrap().unwrap();
    assert!(!first.skipped);
    assert_eq!(first.reminded, vec![event.id]);
    let current = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(current.status, EventStatus::Notified);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_start_and_stop() {
    let h = Harness::new();
    let event = h
        .roster
        .create_event("Raid", "", 5, t0() + Duration::minutes(5))
        .await
        .unwrap();
    h.roster.join(event.id, "alice".into()).await.unwrap();

    let scheduler = Scheduler::new(StdDuration::from_millis(20));
    let spawner = TokioSpawner::current().unwrap();

    assert!(!scheduler.is_running());
    assert!(scheduler.start(h.reconciler.clone(), &spawner));
    assert!(!scheduler.start(h.reconciler.clone(), &spawner));
    assert!(scheduler.is_running());

    tokio::time::timeout(StdDuration::from_secs(5), async {
        while h.notifier.sent_to(&h.config.channels.reminders).is_empty() {
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
    })
    .await
    .expect("scheduler ticked");

    scheduler.stop();
    tokio::time::timeout(StdDuration::from_secs(5), async {
        while scheduler.is_running() {
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
    })
    .await
    .expect("scheduler stopped");

    // Further ticks after stop would not add reminders anyway; restart works.
    assert!(scheduler.start(h.reconciler.clone(), &spawner));
    scheduler.stop();
    assert_eq!(h.notifier.sent_to(&h.config.channels.reminders).len(), 1);
}

#[test]
fn test_scheduler_period_from_config() {
    let config = MusterConfig::default();
    let scheduler = Scheduler::from_config(&config.reconciler);
    assert_eq!(scheduler.period(), StdDuration::from_secs(60));
    assert!(!scheduler.is_running());
}
