//! Runtime adapters: task spawning and the periodic reconcile scheduler.

pub mod scheduler;
pub mod tokio_spawner;

use std::future::Future;

pub use scheduler::Scheduler;
pub use tokio_spawner::TokioSpawner;

/// Abstraction over an async task spawner.
pub trait Spawn {
    /// Spawn a detached task.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
