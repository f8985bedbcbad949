//! In-memory notifier for development and testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::Notifier;
use crate::core::error::{MusterError, MusterResult};
use crate::util::ids::{ChannelId, MessageId};

/// A message as currently stored by [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Message id handed back to the caller.
    pub id: MessageId,
    /// Target channel.
    pub channel: ChannelId,
    /// Latest content.
    pub content: String,
    /// Number of edits applied after sending.
    pub edits: u32,
}

/// Records every message in order; edits update the stored content in place.
pub struct InMemoryNotifier {
    next_id: AtomicU64,
    messages: Mutex<Vec<SentMessage>>,
    index: Mutex<HashMap<MessageId, usize>>,
    failing: AtomicBool,
}

impl InMemoryNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            messages: Mutex::new(Vec::new()),
            index: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// All messages sent so far, in send order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.messages.lock().clone()
    }

    /// Messages sent to one channel, in send order.
    pub fn sent_to(&self, channel: &ChannelId) -> Vec<SentMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| &m.channel == channel)
            .cloned()
            .collect()
    }

    /// Look up a message by id.
    pub fn message(&self, id: &MessageId) -> Option<SentMessage> {
        let pos = self.index.lock().get(id).copied()?;
        self.messages.lock().get(pos).cloned()
    }

    fn check(&self) -> MusterResult<()> {
        if self.failing.load(Ordering::Acquire) {
            Err(MusterError::Notify("transport unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, channel: &ChannelId, content: &str) -> MusterResult<MessageId> {
        self.check()?;
        let id = MessageId(format!("msg-{}", self.next_id.fetch_add(1, Ordering::Relaxed)));
        let mut messages = self.messages.lock();
        self.index.lock().insert(id.clone(), messages.len());
        messages.push(SentMessage {
            id: id.clone(),
            channel: channel.clone(),
            content: content.to_string(),
            edits: 0,
        });
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &str,
    ) -> MusterResult<()> {
        self.check()?;
        let pos = self
            .index
            .lock()
            .get(message)
            .copied()
            .ok_or_else(|| MusterError::Notify(format!("unknown message {message}")))?;
        let mut messages = self.messages.lock();
        let stored = &mut messages[pos];
        if &stored.channel != channel {
            return Err(MusterError::Notify(format!(
                "message {message} is not in channel {channel}"
            )));
        }
        stored.content = content.to_string();
        stored.edits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn edit_replaces_content() {
        let notifier = InMemoryNotifier::new();
        let chan = ChannelId::from("events");
        let id = notifier.notify(&chan, "first").await.unwrap();
        notifier.edit_message(&chan, &id, "second").await.unwrap();

        let msg = notifier.message(&id).unwrap();
        assert_eq!(msg.content, "second");
        assert_eq!(msg.edits, 1);
    }

    #[tokio::test]
    async fn failing_switch() {
        let notifier = InMemoryNotifier::new();
        notifier.set_failing(true);
        let err = notifier.notify(&"x".into(), "hi").await.unwrap_err();
        assert!(matches!(err, MusterError::Notify(_)));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn edit_in_wrong_channel_is_rejected() {
        let notifier = InMemoryNotifier::new();
        let id = notifier.notify(&"a".into(), "hi").await.unwrap();
        assert!(notifier.edit_message(&"b".into(), &id, "x").await.is_err());
    }
}
