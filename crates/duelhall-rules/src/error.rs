//! Error types for the rule engines.

use duelhall_protocol::{ErrorKind, GameType};

use crate::xiangqi::PieceKind;

/// Why a rule engine refused a start or a move.
///
/// A refused move never changes the board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// Every game here is strictly two-player.
    #[error("{game} needs exactly 2 players, got {got}")]
    InvalidPlayerCount { game: GameType, got: usize },

    /// The game is not running (not started yet, or already finished).
    #[error("game is not in progress")]
    NotInProgress,

    #[error("not your turn")]
    TurnViolation,

    /// The payload shape belongs to a different game.
    #[error("move payload does not fit {0}")]
    PayloadMismatch(GameType),

    #[error("coordinates ({row}, {col}) are off the board")]
    OutOfRange { row: i32, col: i32 },

    #[error("cell ({x}, {y}) is already occupied")]
    CellOccupied { x: i32, y: i32 },

    #[error("no piece at source")]
    EmptySource,

    #[error("cannot move opponent piece")]
    OpponentPiece,

    #[error("cannot capture own piece")]
    OwnCapture,

    #[error("illegal move for {0}")]
    IllegalMove(PieceKind),

    #[error("generals cannot face each other")]
    FlyingGenerals,

    #[error("move leaves own general in check")]
    SelfCheck,
}

impl RuleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPlayerCount { .. }
            | Self::NotInProgress
            | Self::TurnViolation
            | Self::CellOccupied { .. } => ErrorKind::Conflict,
            Self::OpponentPiece | Self::OwnCapture => ErrorKind::Forbidden,
            Self::PayloadMismatch(_)
            | Self::OutOfRange { .. }
            | Self::EmptySource
            | Self::IllegalMove(_)
            | Self::FlyingGenerals
            | Self::SelfCheck => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_turn_and_occupancy_as_conflict() {
        assert_eq!(RuleError::TurnViolation.kind(), ErrorKind::Conflict);
        assert_eq!(RuleError::CellOccupied { x: 1, y: 1 }.kind(), ErrorKind::Conflict);
        assert_eq!(RuleError::NotInProgress.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_kind_ownership_violations_are_forbidden() {
        assert_eq!(RuleError::OpponentPiece.kind(), ErrorKind::Forbidden);
        assert_eq!(RuleError::OwnCapture.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_illegal_move_message_names_piece() {
        let err = RuleError::IllegalMove(PieceKind::Horse);
        assert_eq!(err.to_string(), "illegal move for HORSE");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
