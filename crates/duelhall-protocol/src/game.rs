//! The game catalog and the move payloads players submit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// The closed set of games a room can host.
///
/// Serialized by code (`"GOBANG"`, `"CHINESE_CHESS"`). Adding a game
/// means adding a variant here and a rule engine in `duelhall-rules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    Gobang,
    ChineseChess,
}

impl GameType {
    /// Every game, in catalog order.
    pub const ALL: [GameType; 2] = [GameType::Gobang, GameType::ChineseChess];

    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Gobang => "GOBANG",
            Self::ChineseChess => "CHINESE_CHESS",
        }
    }

    /// Human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gobang => "Gobang",
            Self::ChineseChess => "Chinese Chess",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Gobang => "Place five stones in a row on a 15x15 board.",
            Self::ChineseChess => "Classic 9x10 Chinese chess with full movement rules.",
        }
    }

    /// Catalog entry for this game.
    pub fn info(self) -> GameInfo {
        GameInfo {
            code: self,
            name: self.display_name().to_string(),
            description: self.description().to_string(),
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Accepts either the code or the display name, ignoring case:
/// `"gobang"`, `"CHINESE_CHESS"` and `"chinese chess"` all parse.
impl FromStr for GameType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|game| {
                game.code().eq_ignore_ascii_case(wanted)
                    || game.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ProtocolError::UnknownGameType(wanted.to_string()))
    }
}

/// One row of the game catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub code: GameType,
    pub name: String,
    pub description: String,
}

/// A move as submitted by a player.
///
/// The shape decides the variant: `{"x":7,"y":7}` is a stone placement,
/// `{"from_row":6,"from_col":4,"to_row":5,"to_col":4}` a piece move.
/// Coordinates are signed so out-of-range input reaches the rule engine
/// and is rejected there with a proper error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameMove {
    Piece {
        from_row: i32,
        from_col: i32,
        to_row: i32,
        to_col: i32,
    },
    Stone {
        x: i32,
        y: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_code_and_display_name() {
        assert_eq!("GOBANG".parse::<GameType>().unwrap(), GameType::Gobang);
        assert_eq!("gobang".parse::<GameType>().unwrap(), GameType::Gobang);
        assert_eq!(
            "chinese chess".parse::<GameType>().unwrap(),
            GameType::ChineseChess
        );
        assert_eq!(
            "Chinese_Chess".parse::<GameType>().unwrap(),
            GameType::ChineseChess
        );
    }

    #[test]
    fn test_from_str_unknown_returns_error() {
        let err = "checkers".parse::<GameType>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownGameType(ref s) if s == "checkers"));
    }

    #[test]
    fn test_game_type_serializes_as_code() {
        let json = serde_json::to_string(&GameType::ChineseChess).unwrap();
        assert_eq!(json, "\"CHINESE_CHESS\"");
    }

    #[test]
    fn test_catalog_info() {
        let info = GameType::Gobang.info();
        assert_eq!(info.name, "Gobang");
        assert_eq!(info.description, "Place five stones in a row on a 15x15 board.");
        assert_eq!(GameType::ALL.len(), 2);
    }

    #[test]
    fn test_game_move_decodes_by_shape() {
        let stone: GameMove = serde_json::from_str(r#"{"x":7,"y":11}"#).unwrap();
        assert_eq!(stone, GameMove::Stone { x: 7, y: 11 });

        let piece: GameMove =
            serde_json::from_str(r#"{"from_row":6,"from_col":4,"to_row":5,"to_col":4}"#)
                .unwrap();
        assert_eq!(
            piece,
            GameMove::Piece {
                from_row: 6,
                from_col: 4,
                to_row: 5,
                to_col: 4
            }
        );
    }

    #[test]
    fn test_game_move_missing_fields_fails_to_decode() {
        assert!(serde_json::from_str::<GameMove>(r#"{"x":7}"#).is_err());
        assert!(serde_json::from_str::<GameMove>(r#"{"from_row":1,"to_col":2}"#).is_err());
    }
}
