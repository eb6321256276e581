//! Duplicate suppression for inbound notifications.
//!
//! The window is a single slot holding the id of the most recently
//! delivered message. A frame matching that slot is dropped; anything
//! else is delivered and takes the slot. Only the immediately preceding
//! id is compared, so an older id arriving again (A, B, A) is delivered
//! all three times. Frames without an id occupy the slot as an absent
//! id, which means consecutive id-less frames collapse to the first.
//!
//! The slot lives as long as the channel instance. It is deliberately
//! not cleared on reconnect, so a server that repeats the last message
//! after a drop does not double-deliver it.

use crate::messages::MessageId;

/// Single-slot duplicate window over message ids.
#[derive(Debug, Default)]
pub struct DedupWindow {
    last: Option<Option<MessageId>>,
}

impl DedupWindow {
    /// Creates an empty window; the first message is always admitted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` as the most recent message and reports whether it
    /// should be delivered. Returns `false` only when `id` matches the
    /// immediately preceding message.
    pub fn admit(&mut self, id: Option<&MessageId>) -> bool {
        if self.last.as_ref().map(|prev| prev.as_ref()) == Some(id) {
            return false;
        }
        self.last = Some(id.cloned());
        true
    }
}
