//! Outbound notification contract and bundled adapters.

pub mod memory;
pub mod tracing_log;

use async_trait::async_trait;

use crate::core::error::MusterResult;
use crate::util::ids::{ChannelId, MessageId};

pub use memory::{InMemoryNotifier, SentMessage};
pub use tracing_log::TracingNotifier;

/// Message transport used for cards, reminders, and announcements.
///
/// Failures are returned as [`crate::core::MusterError::Notify`]; callers treat them
/// as best-effort and never roll back state because of them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `content` to `channel` and return the id of the new message.
    async fn notify(&self, channel: &ChannelId, content: &str) -> MusterResult<MessageId>;

    /// Replace the content of a message sent earlier.
    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &str,
    ) -> MusterResult<()>;
}
