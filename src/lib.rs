//! Workdistro realtime notification client.
//!
//! This crate provides the reconnecting push-notification channel for
//! the Workdistro marketplace: one WebSocket connection per
//! authenticated session, capped exponential backoff on drops,
//! duplicate suppression, and ordered fan-out to subscribers.
//!
//! # Architecture
//!
//! - **NotificationChannel** - Owned handle; connect/disconnect/send/subscribe
//! - **Connection driver** - Spawned task owning the socket and reconnect logic
//! - **MessageLog** - Shared feed of delivered notifications for embedders
//!
//! # Modules
//!
//! - [`channel`] - The notification channel and its reconnect machinery
//! - [`messages`] - Inbound frame decoding
//! - [`store`] - Shared notification log
//! - [`config`] - Configuration loading/saving

// Library modules
pub mod channel;
pub mod config;
pub mod constants;
pub mod messages;
pub mod store;
pub mod ws;

// Re-export commonly used types
pub use channel::{ChannelConfig, ConnectionState, NotificationChannel, SharedStatus, Subscription};
pub use config::Config;
pub use messages::{MessageId, Notification, NotificationEvent};
pub use store::MessageLog;
