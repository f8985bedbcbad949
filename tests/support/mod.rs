//! Shared fixtures: in-memory store and notifier, a manual clock, and wired managers.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use muster::config::MusterConfig;
use muster::core::{InMemoryAuditSink, MusterResult, PollEngine, Reconciler, RosterManager, SharedAuditSink};
use muster::infra::{InMemoryNotifier, InMemoryStore, Notifier};
use muster::util::{init_tracing, ChannelId, Clock, ManualClock, MessageId};

pub type Roster = RosterManager<InMemoryStore, InMemoryNotifier>;
pub type Polls = PollEngine<InMemoryStore, InMemoryNotifier>;
pub type Recon = Reconciler<InMemoryStore, InMemoryNotifier>;

/// Fixed starting instant for every scenario.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 18, 0, 0).unwrap()
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<InMemoryNotifier>,
    pub clock: Arc<ManualClock>,
    pub config: Arc<MusterConfig>,
    pub audit: Arc<Mutex<InMemoryAuditSink>>,
    pub roster: Arc<Roster>,
    pub polls: Arc<Polls>,
    pub reconciler: Arc<Recon>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(MusterConfig::default())
    }

    pub fn with_config(config: MusterConfig) -> Self {
        Self::with_store(InMemoryStore::new(), config)
    }

    pub fn with_store(store: InMemoryStore, config: MusterConfig) -> Self {
        init_tracing();
        let store = Arc::new(store);
        let notifier = Arc::new(InMemoryNotifier::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let config = Arc::new(config);
        let audit = Arc::new(Mutex::new(InMemoryAuditSink::new(256)));

        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let shared: SharedAuditSink = audit.clone();

        let roster = Arc::new(
            RosterManager::new(store.clone(), notifier.clone(), dyn_clock.clone(), config.clone())
                .with_audit(shared.clone()),
        );
        let polls = Arc::new(
            PollEngine::new(store.clone(), notifier.clone(), dyn_clock.clone(), config.clone())
                .with_audit(shared),
        );
        let reconciler = Arc::new(Reconciler::new(
            roster.clone(),
            polls.clone(),
            dyn_clock,
            config.clone(),
        ));

        Self {
            store,
            notifier,
            clock,
            config,
            audit,
            roster,
            polls,
            reconciler,
        }
    }

    pub fn audit_actions(&self, action: &str) -> usize {
        self.audit.lock().with_action(action).len()
    }
}

/// Notifier that takes the store offline while a send is in progress, so the
/// message id can never be recorded.
pub struct OutageNotifier {
    pub inner: InMemoryNotifier,
    store: Arc<InMemoryStore>,
}

impl OutageNotifier {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            inner: InMemoryNotifier::new(),
            store,
        }
    }
}

#[async_trait]
impl Notifier for OutageNotifier {
    async fn notify(&self, channel: &ChannelId, content: &str) -> MusterResult<MessageId> {
        let sent = self.inner.notify(channel, content).await;
        self.store.set_available(false);
        sent
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

/// Managers wired over an [`OutageNotifier`].
pub fn outage_managers() -> (
    Arc<InMemoryStore>,
    RosterManager<InMemoryStore, OutageNotifier>,
    PollEngine<InMemoryStore, OutageNotifier>,
) {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(OutageNotifier::new(store.clone()));
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(t0()));
    let config = Arc::new(MusterConfig::default());
    let roster = RosterManager::new(store.clone(), notifier.clone(), clock.clone(), config.clone());
    let polls = PollEngine::new(store.clone(), notifier, clock, config);
    (store, roster, polls)
}
