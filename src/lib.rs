//! # Muster
//!
//! Event rosters and community polls driven by a periodic reconciler.
//!
//! Two kinds of entities live side by side:
//!
//! - **Events** have a capacity-bounded roster. Users join and leave; a reminder
//!   naming everyone listed goes out shortly before the start, exactly once.
//! - **Polls** collect options and one vote per user. When the deadline passes the
//!   poll closes with the most-voted option, unless the lead is tied, in which case
//!   a short runoff between the tied options starts.
//!
//! State transitions are persisted through [`infra::store`] before any message is
//! sent through [`infra::notify`]; a failed send is logged and never retried, so
//! side effects happen at most once.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use muster::config::MusterConfig;
//! use muster::core::{PollEngine, Reconciler, RosterManager};
//! use muster::infra::{InMemoryNotifier, InMemoryStore};
//! use muster::runtime::{Scheduler, TokioSpawner};
//! use muster::util::SystemClock;
//!
//! let config = Arc::new(MusterConfig::from_env()?);
//! let store = Arc::new(InMemoryStore::new());
//! let notifier = Arc::new(InMemoryNotifier::new());
//! let clock = Arc::new(SystemClock);
//!
//! let roster = Arc::new(RosterManager::new(store.clone(), notifier.clone(), clock.clone(), config.clone()));
//! let polls = Arc::new(PollEngine::new(store, notifier, clock.clone(), config.clone()));
//! let reconciler = Arc::new(Reconciler::new(roster, polls, clock, config.clone()));
//!
//! let scheduler = Scheduler::from_config(&config.reconciler);
//! scheduler.start(reconciler, &TokioSpawner::current().expect("inside a runtime"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Configuration models for the reconciler, channels, and presentation.
pub mod config;
/// Domain core: rosters, polls, runoffs, and reconciliation.
pub mod core;
/// Persistence and notification adapters.
pub mod infra;
/// Spawning and the periodic scheduler.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
