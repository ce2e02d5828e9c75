//! Error types for the room layer.

use duelhall_protocol::{ErrorKind, GameType, RoomId, UserId};
use duelhall_rules::RuleError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Both seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("user {0} is not in room {1}")]
    NotMember(UserId, RoomId),

    #[error("only the host of room {1} may do this, not {0}")]
    NotHost(UserId, RoomId),

    /// Joining a private room without the right invite code.
    #[error("invalid invite code for room {0}")]
    InviteMismatch(RoomId),

    #[error("room name is required")]
    InvalidName,

    #[error("invalid chat message: {0}")]
    InvalidChat(&'static str),

    #[error("game in room {0} has already started")]
    AlreadyStarted(RoomId),

    #[error("game in room {0} has not started")]
    NotStarted(RoomId),

    #[error("game in room {0} is not finished")]
    NotFinished(RoomId),

    /// Starting needs exactly two seated players.
    #[error("room {0} needs 2 players to start, has {1}")]
    NeedTwoPlayers(RoomId, usize),

    /// The game type cannot change once a game has started.
    #[error("cannot switch room {0} to {1} while a game is running")]
    GameTypeLocked(RoomId, GameType),

    /// The game session refused the move or start.
    #[error(transparent)]
    Rules(#[from] RuleError),

    /// The room's actor has stopped (deleted or shutting down).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) => ErrorKind::NotFound,
            Self::RoomFull(_)
            | Self::AlreadyStarted(_)
            | Self::NotStarted(_)
            | Self::NotFinished(_)
            | Self::NeedTwoPlayers(..)
            | Self::GameTypeLocked(..) => ErrorKind::Conflict,
            Self::NotMember(..) | Self::NotHost(..) | Self::InviteMismatch(_) => {
                ErrorKind::Forbidden
            }
            Self::InvalidName | Self::InvalidChat(_) => ErrorKind::Validation,
            Self::Rules(err) => err.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_room_failures() {
        assert_eq!(RoomError::NotFound(RoomId(1)).kind(), ErrorKind::NotFound);
        assert_eq!(RoomError::RoomFull(RoomId(1)).kind(), ErrorKind::Conflict);
        assert_eq!(
            RoomError::NotHost(UserId(2), RoomId(1)).kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(RoomError::InvalidName.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_delegates_to_rule_error() {
        let err: RoomError = RuleError::SelfCheck.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "move leaves own general in check");
    }
}
