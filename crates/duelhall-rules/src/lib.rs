//! Board rule engines for Duelhall.
//!
//! Two engines, one per game in the catalog:
//!
//! - [`FiveInRow`] — Gobang on a 15×15 grid
//! - [`ChineseChess`] — full xiangqi movement with flying-general and
//!   self-check detection
//!
//! [`GameSession`] wraps whichever engine a room's game type calls for,
//! owns the seating and turn order, and produces the serializable
//! [`GameSnapshot`]. The engines are pure: no I/O, no clocks except the
//! start timestamp handed in by the caller.

pub mod gomoku;
pub mod xiangqi;

mod error;
mod session;

pub use error::RuleError;
pub use gomoku::{FiveInRow, Stone};
pub use session::{BoardSnapshot, GameSession, GameSnapshot, GameStatus, MoveDetail, MoveRecord};
pub use xiangqi::{Board, ChineseChess, Piece, PieceColor, PieceKind, Square};
