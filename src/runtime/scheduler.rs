//! Fixed-interval scheduler for [`Reconciler::tick`].
//!
//! The loop fires on a `tokio::time::interval` with
//! [`MissedTickBehavior::Skip`], so a slow tick never causes a burst of catch-up
//! ticks. Stopping is cooperative: a tick that is already running completes, then
//! the loop exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::Spawn;
use crate::config::ReconcilerConfig;
use crate::core::reconciler::Reconciler;
use crate::infra::notify::Notifier;
use crate::infra::store::{EventStore, PollStore};

/// Start/stop handle for the reconcile loop.
pub struct Scheduler {
    period: Duration,
    running: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
}

impl Scheduler {
    /// Scheduler ticking every `period`.
    pub fn new(period: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            period,
            running: Arc::new(AtomicBool::new(false)),
            shutdown,
        }
    }

    /// Scheduler ticking at the configured interval.
    pub fn from_config(config: &ReconcilerConfig) -> Self {
        Self::new(config.tick_interval())
    }

    /// Tick period.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the reconcile loop. The first tick fires immediately.
    ///
    /// Returns `false` if a loop from this scheduler is still running.
    pub fn start<S, N, Sp>(&self, reconciler: Arc<Reconciler<S, N>>, spawner: &Sp) -> bool
    where
        S: EventStore + PollStore + 'static,
        N: Notifier + 'static,
        Sp: Spawn,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("scheduler already running");
            return false;
        }
        self.shutdown.send_replace(false);
        let mut shutdown = self.shutdown.subscribe();
        let running = Arc::clone(&self.running);
        let period = self.period;

        spawner.spawn(async move {
            tracing::info!("reconcile scheduler started, period {:?}", period);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match reconciler.tick().await {
                            Ok(report) if report.failures > 0 => {
                                tracing::warn!("reconcile tick finished with {} failures", report.failures);
                            }
                            Ok(_) => {}
                            Err(e) => tracing::error!("reconcile tick aborted: {}", e),
                        }
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            tracing::info!("reconcile scheduler stopped");
        });
        true
    }

    /// Ask the loop to stop after the tick in progress, if any.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
