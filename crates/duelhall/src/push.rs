//! Pushing room changes to connected clients.
//!
//! The lobby reports every change to a [`PushSink`] and moves on; it never
//! waits for delivery. [`RoomHub`] is the in-process sink: it encodes each
//! event once and fans the bytes out to the room's subscribers.

use std::sync::Arc;

use dashmap::DashMap;
use duelhall_protocol::{ChatMessage, Codec, JsonCodec, RoomId};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::RoomView;

/// Receives room changes. Best effort: implementations must not block.
pub trait PushSink: Send + Sync + 'static {
    fn notify_room_changed(&self, room: &RoomView);

    fn notify_chat_message(&self, room_id: RoomId, message: &ChatMessage);

    /// The room is gone; release anything held for it.
    fn room_closed(&self, _room_id: RoomId) {}
}

impl<T: PushSink> PushSink for Arc<T> {
    fn notify_room_changed(&self, room: &RoomView) {
        (**self).notify_room_changed(room);
    }

    fn notify_chat_message(&self, room_id: RoomId, message: &ChatMessage) {
        (**self).notify_chat_message(room_id, message);
    }

    fn room_closed(&self, room_id: RoomId) {
        (**self).room_closed(room_id);
    }
}

/// Wire form of a pushed event: `{"type":"roomUpdate","room":{...}}`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushEvent<'a> {
    RoomUpdate { room: &'a RoomView },
    ChatMessage { message: &'a ChatMessage },
}

/// Per-room fan-out of encoded events.
///
/// Subscribers whose receiver has been dropped are pruned on the next
/// event for their room.
#[derive(Debug)]
pub struct RoomHub<C: Codec = JsonCodec> {
    codec: C,
    subscribers: DashMap<RoomId, Vec<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl Default for RoomHub<JsonCodec> {
    fn default() -> Self {
        Self::new(JsonCodec)
    }
}

impl<C: Codec> RoomHub<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            subscribers: DashMap::new(),
        }
    }

    /// Starts receiving `room_id`'s events. The stream ends when the room
    /// is closed.
    pub fn subscribe(&self, room_id: RoomId) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.entry(room_id).or_default().push(tx);
        rx
    }

    pub fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.subscribers
            .get(&room_id)
            .map_or(0, |subs| subs.iter().filter(|tx| !tx.is_closed()).count())
    }

    fn broadcast(&self, room_id: RoomId, event: &PushEvent<'_>) {
        let Some(mut subs) = self.subscribers.get_mut(&room_id) else {
            return;
        };
        let bytes = match self.codec.encode(event) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(%room_id, %err, "failed to encode push event");
                return;
            }
        };
        subs.retain(|tx| tx.send(bytes.clone()).is_ok());
        tracing::trace!(%room_id, subscribers = subs.len(), "push event sent");
    }
}

impl<C: Codec> PushSink for RoomHub<C> {
    fn notify_room_changed(&self, room: &RoomView) {
        self.broadcast(room.room.id, &PushEvent::RoomUpdate { room });
    }

    fn notify_chat_message(&self, room_id: RoomId, message: &ChatMessage) {
        self.broadcast(room_id, &PushEvent::ChatMessage { message });
    }

    fn room_closed(&self, room_id: RoomId) {
        if let Some((_, subs)) = self.subscribers.remove(&room_id) {
            tracing::debug!(%room_id, released = subs.len(), "push subscribers released");
        }
    }
}
