//! Realtime notification channel.
//!
//! One [`NotificationChannel`] maintains at most one live WebSocket
//! connection to the notification server, recovers from drops with
//! capped exponential backoff, suppresses immediately-repeated
//! messages, and fans decoded notifications out to subscribers.
//!
//! # Architecture
//!
//! ```text
//! NotificationChannel (handle)
//!     │  commands: connect / disconnect / send / subscribe
//!     ▼
//! connection driver (spawned task, owns the socket)
//!     │  decode → dedup → fan out
//!     ▼
//! Subscription (per-subscriber queue)
//! ```
//!
//! The handle is cheap and infallible: every operation is a command on
//! a single queue consumed by the driver task, so calls interleave on
//! one logical timeline regardless of caller. Failures inside the
//! driver are logged and absorbed into the connection state; they never
//! surface as errors to callers.

pub mod backoff;
mod connection;
pub mod dedup;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::constants::{
    DEFAULT_ENDPOINT, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS,
    SUBSCRIBER_QUEUE_CAPACITY,
};
use crate::messages::Notification;
use connection::Command;

/// Configuration for a notification channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Server base URL (`wss://` or `https://`; the latter is rewritten).
    pub endpoint: String,
    /// Delay before the first reconnection attempt, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Ceiling for the reconnection delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Connection state for the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected. Also the state while a reconnection is pending.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Connected and delivering.
    Connected,
}

/// Shared connection status that can be observed from outside the channel.
///
/// Written only by the driver task. The attempt counter climbs as
/// reconnections are scheduled and resets to zero when a connection
/// opens, so an embedder can surface degraded connectivity.
#[derive(Debug, Default)]
pub struct SharedStatus {
    state: RwLock<ConnectionState>,
    reconnect_attempts: AtomicU32,
}

impl SharedStatus {
    /// Create new shared status.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get the current state.
    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Check if connected.
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Connected)
    }

    /// Reconnection attempts scheduled since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    pub(crate) async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }

    pub(crate) fn set_attempts(&self, attempts: u32) {
        self.reconnect_attempts.store(attempts, Ordering::Relaxed);
    }
}

/// A registered subscriber's receiving end.
///
/// Every non-duplicate notification is delivered to all live
/// subscriptions in registration order. A subscription that falls
/// behind its queue capacity loses newer messages; dropping it
/// unregisters the subscriber.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Notification>,
}

impl Subscription {
    /// Receive the next notification, or `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Non-blocking receive; `None` when nothing is queued right now.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

/// Handle to an owned realtime notification channel.
///
/// Construct one per authenticated session with [`NotificationChannel::new`]
/// and share it by reference; the connection itself lives in a spawned
/// driver task. Dropping the handle stops the driver.
#[derive(Debug)]
pub struct NotificationChannel {
    cmd_tx: mpsc::UnboundedSender<Command>,
    status: Arc<SharedStatus>,
    driver: tokio::task::JoinHandle<()>,
}

impl NotificationChannel {
    /// Creates the channel and spawns its driver task.
    ///
    /// Must be called within a Tokio runtime. The channel starts
    /// disconnected; nothing is dialed until [`connect`](Self::connect).
    pub fn new(config: ChannelConfig) -> Self {
        let status = SharedStatus::new();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(connection::run(config, cmd_rx, Arc::clone(&status)));
        Self {
            cmd_tx,
            status,
            driver,
        }
    }

    /// Opens the connection for the given credentials and arms
    /// automatic reconnection.
    ///
    /// No-op when already connected (the live connection and its
    /// credentials are kept). An empty token is rejected with an error
    /// log and no state change. A call landing while a reconnection
    /// delay is pending cancels the delay and retries immediately with
    /// the new credentials.
    pub fn connect(&self, token: &str, role: &str) {
        if token.is_empty() {
            log::error!("[Notify] connect requested without an auth token; ignoring");
            return;
        }
        self.command(Command::Connect {
            token: token.to_owned(),
            role: role.to_owned(),
        });
    }

    /// Closes the connection and disarms automatic reconnection.
    ///
    /// Cancels a pending reconnection delay if one is armed. Idempotent;
    /// the channel stays quiet until the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Transmits `payload` as a JSON text frame if the connection is
    /// currently open; otherwise logs a warning and drops it.
    ///
    /// There is no outbound queue: a payload sent while disconnected is
    /// gone, not deferred.
    pub fn send(&self, payload: serde_json::Value) {
        self.command(Command::Send { payload });
    }

    /// Registers a subscriber. Valid in any connection state; the
    /// registration survives reconnects.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.command(Command::Subscribe { tx });
        Subscription { rx }
    }

    /// Cheap observer of the connection state and attempt counter.
    pub fn status(&self) -> Arc<SharedStatus> {
        Arc::clone(&self.status)
    }

    /// Stops the driver task and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        let _ = self.driver.await;
    }

    fn command(&self, command: Command) {
        // Fails only after shutdown, when there is nothing left to notify
        if self.cmd_tx.send(command).is_err() {
            log::debug!("[Notify] channel driver is gone; command dropped");
        }
    }
}

// Re-exports
pub use backoff::Backoff;
pub use dedup::DedupWindow;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.initial_backoff_ms, 1_000);
        assert_eq!(config.max_backoff_ms, 30_000);
    }

    #[test]
    fn test_initial_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_shared_status_roundtrip() {
        let status = SharedStatus::new();
        assert!(!status.is_connected().await);

        status.set_state(ConnectionState::Connected).await;
        assert!(status.is_connected().await);
        assert_eq!(status.state().await, ConnectionState::Connected);

        status.set_attempts(3);
        assert_eq!(status.reconnect_attempts(), 3);
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected_without_side_effects() {
        let channel = NotificationChannel::new(ChannelConfig::default());
        channel.connect("", "client");

        // The rejected call must not reach the driver at all
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(channel.status().state().await, ConnectionState::Disconnected);
        channel.shutdown().await;
    }
}
