//! What callers and push subscribers see of a room.

use duelhall_room::RoomSnapshot;
use duelhall_session::UserProfile;
use serde::Serialize;

/// A room snapshot with the seated players' profiles, in seating order.
#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    #[serde(flatten)]
    pub room: RoomSnapshot,
    pub players: Vec<UserProfile>,
}
