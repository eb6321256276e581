//! Application-wide constants for workdistro-notify.
//!
//! This module centralizes all magic numbers and configuration defaults
//! to improve maintainability and discoverability. Constants are grouped
//! by domain with documentation explaining their purpose.
//!
//! # Categories
//!
//! - **Endpoint**: Default server location and wire paths
//! - **Backoff**: Reconnection delay defaults
//! - **Timeouts**: Network operation timeouts
//! - **Capacities**: Channel and log bounds

use std::time::Duration;

// ============================================================================
// Endpoint
// ============================================================================

/// Default notification server endpoint.
///
/// Overridable via the config file or `WORKDISTRO_ENDPOINT`. An
/// `https://` scheme is rewritten to `wss://` at connect time, so both
/// forms are accepted here.
pub const DEFAULT_ENDPOINT: &str = "wss://workdistro-1.onrender.com";

/// Path of the notification socket on the server.
///
/// The trailing slash is part of the route; the server does not
/// redirect the slashless form for WebSocket upgrades.
pub const NOTIFICATIONS_PATH: &str = "/ws/notifications/";

// ============================================================================
// Backoff
// ============================================================================

/// Default delay before the first reconnection attempt.
///
/// One second recovers quickly from transient drops without hammering
/// a server that is rejecting connections.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1_000;

/// Default ceiling for the reconnection delay.
///
/// Delays double per attempt and are capped here, so a long outage
/// settles into one attempt every 30 seconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

// ============================================================================
// Timeouts
// ============================================================================

/// WebSocket handshake timeout.
///
/// Bounds the TCP + TLS + upgrade sequence for a single attempt. A
/// handshake that exceeds this counts as a failed attempt and feeds
/// the normal backoff schedule.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Capacities
// ============================================================================

/// Per-subscriber delivery queue capacity.
///
/// A subscriber that stops draining its queue loses newer messages
/// rather than stalling delivery to other subscribers.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

/// Maximum entries retained by [`MessageLog`](crate::store::MessageLog).
///
/// Oldest entries are evicted first once the log is full.
pub const MESSAGE_LOG_CAPACITY: usize = 500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_defaults_are_reasonable() {
        // First retry should be prompt but not immediate
        assert!(DEFAULT_INITIAL_BACKOFF_MS >= 100);
        assert!(DEFAULT_INITIAL_BACKOFF_MS <= 5_000);

        // Ceiling must dominate the initial delay and stay under 5 minutes
        assert!(DEFAULT_MAX_BACKOFF_MS >= DEFAULT_INITIAL_BACKOFF_MS);
        assert!(DEFAULT_MAX_BACKOFF_MS <= 300_000);
    }

    #[test]
    fn test_connect_timeout_is_reasonable() {
        // Handshake timeout should be between 5-60 seconds
        assert!(CONNECT_TIMEOUT >= Duration::from_secs(5));
        assert!(CONNECT_TIMEOUT <= Duration::from_secs(60));
    }

    #[test]
    fn test_capacities_are_positive() {
        assert!(SUBSCRIBER_QUEUE_CAPACITY >= 8);
        assert!(MESSAGE_LOG_CAPACITY >= SUBSCRIBER_QUEUE_CAPACITY);
    }

    #[test]
    fn test_endpoint_shape() {
        assert!(DEFAULT_ENDPOINT.starts_with("wss://"));
        assert!(NOTIFICATIONS_PATH.starts_with('/'));
        assert!(NOTIFICATIONS_PATH.ends_with('/'));
    }
}
