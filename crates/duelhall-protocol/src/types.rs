//! Core types shared by every Duelhall layer.
//!
//! These are the values that cross crate boundaries and, through an
//! adapter, the wire: identities, chat messages, and the error taxonomy
//! every operation reports against.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a registered user.
///
/// Newtype over `u64` so a `UserId` can never be passed where a `RoomId`
/// is expected. `#[serde(transparent)]` keeps it a bare number on the
/// wire: `UserId(42)` serializes as `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A unique identifier for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A chat line posted by a room member.
///
/// `id` is assigned by the room and increases monotonically, so clients
/// can ask for "everything after id N".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// The category a failure belongs to.
///
/// Every crate-level error maps onto one of these so an adapter can pick
/// a status code without matching on individual variants. None of these
/// are retried internally; they go straight back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed input: bad coordinates, wrong payload shape, blank names.
    Validation,
    /// The caller could not be identified.
    Unauthorized,
    /// The caller is known but not allowed to do this.
    Forbidden,
    /// The room or user does not exist.
    NotFound,
    /// The request is well-formed but clashes with current state.
    Conflict,
}

impl ErrorKind {
    /// HTTP-style status code for this category.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "Validation"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::NotFound => write!(f, "NotFound"),
            Self::Conflict => write!(f, "Conflict"),
        }
    }
}

/// Milliseconds since the Unix epoch for `at`, saturating at zero for
/// times before 1970.
pub fn epoch_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
