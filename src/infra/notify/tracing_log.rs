//! Notifier that only writes outbound content to the log.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::Notifier;
use crate::core::error::MusterResult;
use crate::util::ids::{ChannelId, MessageId};

/// Logs every send and edit at `info` level; useful for hosts without a transport.
#[derive(Default)]
pub struct TracingNotifier {
    next_id: AtomicU64,
}

impl TracingNotifier {
    /// Create a logging notifier.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, channel: &ChannelId, content: &str) -> MusterResult<MessageId> {
        let id = MessageId(format!("log-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1));
        tracing::info!(target: "muster::notify", "send {} to {}: {}", id, channel, content);
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &str,
    ) -> MusterResult<()> {
        tracing::info!(target: "muster::notify", "edit {} in {}: {}", message, channel, content);
        Ok(())
    }
}
