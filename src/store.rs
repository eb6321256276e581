//! Shared notification log.
//!
//! [`MessageLog`] is a bounded, clone-to-share log of delivered
//! notifications: the piece an embedding UI reads its notification
//! feed from. It is fed by [`MessageLog::attach`], which bridges a
//! channel subscription into the log on a background task.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::channel::NotificationChannel;
use crate::constants::MESSAGE_LOG_CAPACITY;
use crate::messages::Notification;

/// Bounded, shared log of delivered notifications.
///
/// Cloning shares the underlying log. Once full, pushing evicts the
/// oldest entry.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: Arc<RwLock<VecDeque<Notification>>>,
    capacity: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    /// Creates an empty log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(MESSAGE_LOG_CAPACITY)
    }

    /// Creates an empty log holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Appends a notification, evicting the oldest entry when full.
    pub async fn push(&self, notification: Notification) {
        let mut entries = self.entries.write().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
    }

    /// All retained notifications, oldest first.
    pub async fn snapshot(&self) -> Vec<Notification> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Removes every retained notification.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of retained notifications.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Subscribes to `channel` and spawns a collector task that drains
    /// the subscription into this log.
    ///
    /// The task ends when the channel shuts down. Detaching early is
    /// done by aborting the returned handle.
    pub fn attach(&self, channel: &NotificationChannel) -> tokio::task::JoinHandle<()> {
        let mut subscription = channel.subscribe();
        let log = self.clone();
        tokio::spawn(async move {
            while let Some(notification) = subscription.recv().await {
                log.push(notification).await;
            }
            log::debug!("[Notify] message log collector stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(id: &str) -> Notification {
        Notification::decode(&format!(r#"{{"id": "{id}", "type": "STATUS_UPDATE"}}"#)).unwrap()
    }

    #[tokio::test]
    async fn test_push_and_snapshot_preserve_order() {
        let log = MessageLog::new();
        log.push(notification("a")).await;
        log.push(notification("b")).await;

        let entries = log.snapshot().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, notification("a").id);
        assert_eq!(entries[1].id, notification("b").id);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let log = MessageLog::with_capacity(2);
        log.push(notification("a")).await;
        log.push(notification("b")).await;
        log.push(notification("c")).await;

        let entries = log.snapshot().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, notification("b").id);
        assert_eq!(entries[1].id, notification("c").id);
    }

    #[tokio::test]
    async fn test_clear_empties_the_log() {
        let log = MessageLog::new();
        log.push(notification("a")).await;
        assert!(!log.is_empty().await);

        log.clear().await;
        assert!(log.is_empty().await);
        assert_eq!(log.len().await, 0);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let log = MessageLog::new();
        let view = log.clone();
        log.push(notification("a")).await;
        assert_eq!(view.len().await, 1);
    }
}
