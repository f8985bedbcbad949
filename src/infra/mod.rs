//! Infrastructure adapters: persistence and outbound notifications.

pub mod notify;
pub mod store;

pub use notify::{InMemoryNotifier, Notifier, TracingNotifier};
pub use store::{EventStore, InMemoryStore, PollStore};
