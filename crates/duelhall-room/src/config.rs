//! Room configuration and lifecycle phase.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seats per room. Every game in the catalog is two-player.
pub const SEATS: usize = 2;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Timing and capacity knobs shared by every room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How long the player to move has before forfeiting.
    pub turn_timeout: Duration,

    /// How long a player who leaves mid-game keeps their seat.
    pub disconnect_grace: Duration,

    /// Chat lines kept per room; older lines are dropped first.
    pub chat_history_limit: usize,

    /// Bound of each room actor's command channel.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(15),
            disconnect_grace: Duration::from_secs(30),
            chat_history_limit: 200,
            command_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its lifecycle.
///
/// ```text
///            start                      win / draw / forfeit
/// Waiting ─────────→ InProgress ────────────────────────────→ Finished
///    ↑                    │                                      │
///    └── disconnect reset ┘              restart ──→ InProgress ─┘
/// ```
///
/// Derived from the room's game session rather than stored, so it can
/// never disagree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    Waiting,
    InProgress,
    Finished,
}

impl RoomPhase {
    /// Returns `true` if new players may take a free seat.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` while moves are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Finished => write!(f, "FINISHED"),
        }
    }
}
