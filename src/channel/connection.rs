//! Background connection driver.
//!
//! Owns the WebSocket and all mutable channel state. The driver moves
//! between two modes: idle (waiting for a connect command, never
//! dialing) and active (keeping a connection up, reconnecting with
//! backoff when it drops). A manual disconnect returns the driver to
//! idle and cancels any pending reconnection delay; the delay is raced
//! against the command queue, so cancellation is deterministic rather
//! than best-effort.
//!
//! Inbound path for each text frame: decode, consult the duplicate
//! window, fan out to subscribers in registration order. A frame that
//! fails to decode is logged and dropped without touching the
//! connection.

// Rust guideline compliant 2026-02

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::backoff::Backoff;
use super::dedup::DedupWindow;
use super::{ChannelConfig, ConnectionState, SharedStatus};
use crate::constants::NOTIFICATIONS_PATH;
use crate::messages::Notification;
use crate::ws::{self, WsMessage, WsReader, WsWriter};

/// Command sent from the public handle to the driver task.
pub(crate) enum Command {
    /// Open the connection with these credentials and arm reconnection.
    Connect {
        /// Auth token, non-empty (checked at the public boundary).
        token: String,
        /// Recipient role the server filters notifications by.
        role: String,
    },
    /// Close the connection and disarm reconnection.
    Disconnect,
    /// Transmit a payload if the connection is open.
    Send {
        /// JSON payload to serialize onto the socket.
        payload: serde_json::Value,
    },
    /// Register a subscriber.
    Subscribe {
        /// Delivery queue for the new subscriber.
        tx: mpsc::Sender<Notification>,
    },
    /// Stop the driver task.
    Shutdown,
}

/// Credentials captured from the most recent connect command.
struct Credentials {
    token: String,
    role: String,
}

/// Driver entry point; runs until shutdown or until the handle is dropped.
pub(crate) async fn run(
    config: ChannelConfig,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    status: Arc<SharedStatus>,
) {
    drive(config, cmd_rx, Arc::clone(&status)).await;
    status.set_state(ConnectionState::Disconnected).await;
    log::debug!("[Notify] connection driver stopped");
}

async fn drive(
    config: ChannelConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    status: Arc<SharedStatus>,
) {
    // Subscribers and the duplicate window live as long as the driver:
    // both persist across reconnects and manual disconnect cycles
    let mut subscribers: Vec<mpsc::Sender<Notification>> = Vec::new();
    let mut dedup = DedupWindow::new();
    let mut backoff = Backoff::new(config.initial_backoff_ms, config.max_backoff_ms);

    'idle: loop {
        status.set_state(ConnectionState::Disconnected).await;

        let Some(mut credentials) = wait_for_connect(&mut cmd_rx, &mut subscribers).await else {
            return;
        };

        // Active mode: hold a connection until disconnect or shutdown
        loop {
            status.set_state(ConnectionState::Connecting).await;
            let url =
                build_notifications_url(&config.endpoint, &credentials.token, &credentials.role);
            log::info!("[Notify] connecting to {}", ws::redact_query(&url));

            match ws::connect(&url).await {
                Ok((writer, reader)) => {
                    log::info!("[Notify] connected (role {})", credentials.role);
                    backoff.reset();
                    status.set_attempts(0);
                    status.set_state(ConnectionState::Connected).await;

                    match run_session(writer, reader, &mut cmd_rx, &mut subscribers, &mut dedup)
                        .await
                    {
                        SessionExit::Shutdown => return,
                        SessionExit::ManualDisconnect => continue 'idle,
                        SessionExit::ConnectionLost => {}
                    }
                }
                Err(e) => {
                    log::warn!("[Notify] connection attempt failed: {e:#}");
                }
            }

            // Lost or never established -- schedule a retry
            status.set_state(ConnectionState::Disconnected).await;
            let delay = backoff.next_delay();
            status.set_attempts(backoff.attempts());
            log::info!(
                "[Notify] reconnecting in {}ms (attempt {})",
                delay.as_millis(),
                backoff.attempts()
            );

            match wait_for_retry(delay, &mut cmd_rx, &mut subscribers).await {
                RetryExit::Elapsed => {}
                RetryExit::NewCredentials(new_credentials) => credentials = new_credentials,
                RetryExit::ManualDisconnect => continue 'idle,
                RetryExit::Shutdown => return,
            }
        }
    }
}

/// Idle mode: absorb commands until a connect arrives.
///
/// Returns `None` on shutdown or when the handle is dropped.
async fn wait_for_connect(
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    subscribers: &mut Vec<mpsc::Sender<Notification>>,
) -> Option<Credentials> {
    loop {
        match cmd_rx.recv().await? {
            Command::Connect { token, role } => return Some(Credentials { token, role }),
            Command::Disconnect => {
                log::debug!("[Notify] already disconnected");
            }
            Command::Send { .. } => {
                log::warn!("[Notify] WebSocket not connected; dropping outbound message");
            }
            Command::Subscribe { tx } => subscribers.push(tx),
            Command::Shutdown => return None,
        }
    }
}

/// Result of one open-socket session.
enum SessionExit {
    /// Shutdown was requested.
    Shutdown,
    /// Disconnect was requested -- back to idle, no reconnect.
    ManualDisconnect,
    /// Connection was lost -- should reconnect.
    ConnectionLost,
}

/// Message loop for a single open connection.
///
/// Races the command queue against the socket. Returns when the
/// connection ends, one way or another.
async fn run_session(
    mut writer: WsWriter,
    mut reader: WsReader,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    subscribers: &mut Vec<mpsc::Sender<Notification>>,
    dedup: &mut DedupWindow,
) -> SessionExit {
    loop {
        tokio::select! {
            command = cmd_rx.recv() => match command {
                Some(Command::Connect { .. }) => {
                    // Keep the live connection and its credentials
                    log::debug!("[Notify] already connected; ignoring connect");
                }
                Some(Command::Disconnect) => {
                    log::info!("[Notify] disconnect requested, closing connection");
                    let _ = writer.close().await;
                    return SessionExit::ManualDisconnect;
                }
                Some(Command::Send { payload }) => {
                    let text = payload.to_string();
                    if let Err(e) = writer.send_text(&text).await {
                        log::warn!("[Notify] send failed: {e:#}");
                        return SessionExit::ConnectionLost;
                    }
                    log::trace!("[Notify] sent {} byte payload", text.len());
                }
                Some(Command::Subscribe { tx }) => subscribers.push(tx),
                Some(Command::Shutdown) | None => {
                    let _ = writer.close().await;
                    return SessionExit::Shutdown;
                }
            },

            frame = reader.recv() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_text_frame(&text, subscribers, dedup);
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    let _ = writer.send_pong(data).await;
                }
                Some(Ok(WsMessage::Pong(_))) => {}
                Some(Ok(WsMessage::Binary(data))) => {
                    log::debug!("[Notify] ignoring {} byte binary frame", data.len());
                }
                Some(Ok(WsMessage::Close { code, reason })) => {
                    if reason.is_empty() {
                        log::info!("[Notify] connection closed by server (code {code})");
                    } else {
                        log::info!("[Notify] connection closed by server (code {code}: {reason})");
                    }
                    return SessionExit::ConnectionLost;
                }
                Some(Err(e)) => {
                    log::warn!("[Notify] WebSocket error: {e}");
                    return SessionExit::ConnectionLost;
                }
                None => {
                    log::info!("[Notify] WebSocket stream ended");
                    return SessionExit::ConnectionLost;
                }
            },
        }
    }
}

/// Result of waiting out a reconnection delay.
enum RetryExit {
    /// Delay elapsed -- dial again.
    Elapsed,
    /// Connect arrived mid-delay -- dial immediately with these credentials.
    NewCredentials(Credentials),
    /// Disconnect arrived mid-delay -- cancel the retry, back to idle.
    ManualDisconnect,
    /// Shutdown was requested.
    Shutdown,
}

/// Sleep out a reconnection delay while staying responsive to commands.
async fn wait_for_retry(
    delay: Duration,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    subscribers: &mut Vec<mpsc::Sender<Notification>>,
) -> RetryExit {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return RetryExit::Elapsed,

            command = cmd_rx.recv() => match command {
                Some(Command::Connect { token, role }) => {
                    log::info!("[Notify] connect requested, retrying immediately");
                    return RetryExit::NewCredentials(Credentials { token, role });
                }
                Some(Command::Disconnect) => {
                    log::info!("[Notify] disconnect requested, cancelling scheduled reconnect");
                    return RetryExit::ManualDisconnect;
                }
                Some(Command::Send { .. }) => {
                    log::warn!("[Notify] WebSocket not connected; dropping outbound message");
                }
                Some(Command::Subscribe { tx }) => subscribers.push(tx),
                Some(Command::Shutdown) | None => return RetryExit::Shutdown,
            },
        }
    }
}

/// Decode a text frame, apply duplicate suppression, fan out.
fn handle_text_frame(
    text: &str,
    subscribers: &mut Vec<mpsc::Sender<Notification>>,
    dedup: &mut DedupWindow,
) {
    let notification = match Notification::decode(text) {
        Ok(notification) => notification,
        Err(e) => {
            log::warn!("[Notify] dropping malformed frame: {e:#}");
            return;
        }
    };

    if !dedup.admit(notification.id.as_ref()) {
        match &notification.id {
            Some(id) => log::debug!("[Notify] suppressing repeat of message {}", id),
            None => log::debug!("[Notify] suppressing repeated id-less message"),
        }
        return;
    }

    deliver(subscribers, &notification);
}

/// Deliver to all live subscribers in registration order.
///
/// A subscriber with a full queue loses this message; a subscriber
/// whose receiver was dropped is unregistered.
fn deliver(subscribers: &mut Vec<mpsc::Sender<Notification>>, notification: &Notification) {
    let mut index = 0;
    while index < subscribers.len() {
        match subscribers[index].try_send(notification.clone()) {
            Ok(()) => index += 1,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("[Notify] subscriber queue full; dropping message for that subscriber");
                index += 1;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                let _ = subscribers.remove(index);
            }
        }
    }
}

/// Build the notification socket URL with URL-encoded credentials.
///
/// Accepts `https://` endpoints by rewriting the scheme; tolerates a
/// trailing slash on the endpoint.
fn build_notifications_url(endpoint: &str, token: &str, role: &str) -> String {
    format!(
        "{}{}?token={}&recipient_type={}",
        ws::http_to_ws_scheme(endpoint.trim_end_matches('/')),
        NOTIFICATIONS_PATH,
        urlencoding::encode(token),
        urlencoding::encode(role)
    )
}
