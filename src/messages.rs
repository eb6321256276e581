//! Inbound notification decoding.
//!
//! The server pushes JSON text frames shaped like
//! `{ "id": <string|number>, "type": "STATUS_UPDATE", "content": "..." }`
//! plus whatever extra fields a given event carries. Decoding is total
//! over well-formed JSON objects: recognized `type` values map to their
//! event variants, everything else lands in [`NotificationEvent::Unknown`]
//! and still reaches subscribers. Only frames that are not JSON objects
//! are rejected.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire value for a new-application event.
pub const KIND_NEW_APPLICATION: &str = "NEW_APPLICATION";

/// Wire value for a status-update event.
pub const KIND_STATUS_UPDATE: &str = "STATUS_UPDATE";

/// Message identifier as sent by the server.
///
/// The server is inconsistent about id types, so both forms are kept
/// as-is. Equality is strict across the two forms: a textual `"1"` and
/// a numeric `1` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// String identifier.
    Text(String),
    /// Numeric identifier.
    Number(serde_json::Number),
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Event classification derived from the frame's `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A worker applied to one of the recipient's gigs.
    NewApplication,
    /// A gig or application changed status.
    StatusUpdate,
    /// Any event kind this client does not recognize. Carries the raw
    /// `type` value (empty when the frame had none).
    Unknown(String),
}

impl NotificationEvent {
    fn from_kind(kind: &str) -> Self {
        match kind {
            KIND_NEW_APPLICATION => Self::NewApplication,
            KIND_STATUS_UPDATE => Self::StatusUpdate,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// The wire `type` value for this event.
    pub fn kind(&self) -> &str {
        match self {
            Self::NewApplication => KIND_NEW_APPLICATION,
            Self::StatusUpdate => KIND_STATUS_UPDATE,
            Self::Unknown(kind) => kind,
        }
    }
}

/// One decoded push notification.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Server-assigned id, when present. Drives duplicate suppression.
    pub id: Option<MessageId>,
    /// Classified event kind.
    pub event: NotificationEvent,
    /// Human-readable body, when present.
    pub content: Option<String>,
    /// The complete frame, retained for fields this client does not model.
    pub raw: Value,
    /// When this client received the frame.
    pub received_at: DateTime<Utc>,
}

impl Notification {
    /// Decodes a text frame.
    ///
    /// Returns an error only for frames that are not JSON objects; an
    /// unrecognized or absent `type` decodes as
    /// [`NotificationEvent::Unknown`], and a missing or non-scalar `id`
    /// decodes as `None`.
    pub fn decode(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text).context("frame is not valid JSON")?;
        let obj = raw.as_object().context("frame is not a JSON object")?;

        let id = match obj.get("id") {
            Some(Value::String(s)) => Some(MessageId::Text(s.clone())),
            Some(Value::Number(n)) => Some(MessageId::Number(n.clone())),
            _ => None,
        };
        let kind = obj.get("type").and_then(Value::as_str).unwrap_or_default();
        let content = obj
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self {
            id,
            event: NotificationEvent::from_kind(kind),
            content,
            raw,
            received_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_new_application() {
        let n = Notification::decode(
            r#"{"id": "42", "type": "NEW_APPLICATION", "content": "New application received"}"#,
        )
        .unwrap();
        assert_eq!(n.id, Some(MessageId::Text("42".into())));
        assert_eq!(n.event, NotificationEvent::NewApplication);
        assert_eq!(n.content.as_deref(), Some("New application received"));
    }

    #[test]
    fn test_decode_status_update_numeric_id() {
        let n = Notification::decode(r#"{"id": 7, "type": "STATUS_UPDATE"}"#).unwrap();
        assert_eq!(n.id, Some(MessageId::Number(7.into())));
        assert_eq!(n.event, NotificationEvent::StatusUpdate);
        assert!(n.content.is_none());
    }

    #[test]
    fn test_decode_unknown_kind_is_delivered_not_rejected() {
        let n = Notification::decode(r#"{"id": "1", "type": "PAYMENT_SETTLED"}"#).unwrap();
        assert_eq!(n.event, NotificationEvent::Unknown("PAYMENT_SETTLED".into()));
        assert_eq!(n.event.kind(), "PAYMENT_SETTLED");
    }

    #[test]
    fn test_decode_missing_type_and_id() {
        let n = Notification::decode(r#"{"content": "hello"}"#).unwrap();
        assert!(n.id.is_none());
        assert_eq!(n.event, NotificationEvent::Unknown(String::new()));
    }

    #[test]
    fn test_string_and_numeric_ids_are_distinct() {
        let text = Notification::decode(r#"{"id": "1", "type": "X"}"#).unwrap();
        let num = Notification::decode(r#"{"id": 1, "type": "X"}"#).unwrap();
        assert_ne!(text.id, num.id);
    }

    #[test]
    fn test_extra_fields_survive_in_raw() {
        let n = Notification::decode(r#"{"id": "1", "type": "STATUS_UPDATE", "gig_id": 99}"#)
            .unwrap();
        assert_eq!(n.raw["gig_id"], 99);
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        assert!(Notification::decode("{not json").is_err());
    }

    #[test]
    fn test_decode_rejects_non_object_frames() {
        assert!(Notification::decode("[1, 2, 3]").is_err());
        assert!(Notification::decode("\"hello\"").is_err());
    }

    #[test]
    fn test_null_id_decodes_as_absent() {
        let n = Notification::decode(r#"{"id": null, "type": "STATUS_UPDATE"}"#).unwrap();
        assert!(n.id.is_none());
    }
}
