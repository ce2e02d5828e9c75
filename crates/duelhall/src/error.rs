//! Unified error type for the lobby.

use duelhall_protocol::{ErrorKind, ProtocolError};
use duelhall_room::RoomError;
use duelhall_session::SessionError;

/// Top-level error wrapping every crate-specific error.
///
/// `#[from]` lets `?` lift sub-crate errors, and [`kind`](Self::kind)
/// gives an adapter the status to answer with.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// Room, game session, or rule failure.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Unknown user, bad token, taken username.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl LobbyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Room(err) => err.kind(),
            Self::Session(err) => err.kind(),
            Self::Protocol(err) => err.kind(),
        }
    }

    /// HTTP-style status for [`kind`](Self::kind).
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}
