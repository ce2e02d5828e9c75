//! One play-through of a game: the rule engine plus turn bookkeeping.

use std::time::SystemTime;

use duelhall_protocol::{GameMove, GameType, UserId, epoch_millis};
use serde::{Deserialize, Serialize};

use crate::RuleError;
use crate::gomoku::{self, FiveInRow, Placement, Stone};
use crate::xiangqi::{ChineseChess, Piece, PieceColor, PieceKind, PieceView, PlyOutcome};

/// Lifecycle of a session.
///
/// ```text
/// Ready ──start──→ InProgress ──win / draw / forfeit──→ Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Ready,
    InProgress,
    Finished,
}

/// The board for the chosen game, picked once at construction.
#[derive(Debug, Clone)]
enum Engine {
    FiveInRow(FiveInRow),
    ChineseChess(ChineseChess),
}

impl Engine {
    fn fresh(game_type: GameType) -> Self {
        match game_type {
            GameType::Gobang => Self::FiveInRow(FiveInRow::new()),
            GameType::ChineseChess => Self::ChineseChess(ChineseChess::new()),
        }
    }
}

/// The game-specific half of a move log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MoveDetail {
    Stone {
        x: i32,
        y: i32,
        stone: Stone,
    },
    Piece {
        from_row: i32,
        from_col: i32,
        to_row: i32,
        to_col: i32,
        piece: PieceKind,
        color: PieceColor,
        captured: Option<PieceKind>,
        captured_color: Option<PieceColor>,
        is_check: bool,
    },
}

/// One accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub move_number: usize,
    pub player_id: UserId,
    #[serde(flatten)]
    pub detail: MoveDetail,
}

/// Board cells in transport form.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BoardSnapshot {
    /// `1` for the first player's stones, `-1` for the second, `0` empty.
    Stones {
        board_size: usize,
        cells: Vec<Vec<i8>>,
    },
    Pieces {
        cells: Vec<Vec<Option<PieceView>>>,
    },
}

/// Everything a client needs to render the game.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub game_type: GameType,
    pub status: GameStatus,
    pub board: BoardSnapshot,
    pub moves: Vec<MoveRecord>,
    pub player_order: Vec<UserId>,
    pub current_player_id: Option<UserId>,
    /// Chinese chess only. The side whose turn it is, or was when the game
    /// ended; present in every phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player_color: Option<PieceColor>,
    pub winner_id: Option<UserId>,
    pub draw: bool,
    pub started_at_ms: Option<u64>,
}

/// A live game bound to a room's seating.
///
/// The seat index decides the side: seat 0 plays Black stones in Gobang
/// and Red in Chinese chess, and moves first in both.
#[derive(Debug, Clone)]
pub struct GameSession {
    game_type: GameType,
    engine: Engine,
    players: Vec<UserId>,
    turn: usize,
    status: GameStatus,
    winner: Option<UserId>,
    draw: bool,
    moves: Vec<MoveRecord>,
    started_at: Option<SystemTime>,
}

impl GameSession {
    /// A session in [`GameStatus::Ready`] with a fresh board.
    pub fn new(game_type: GameType) -> Self {
        Self {
            game_type,
            engine: Engine::fresh(game_type),
            players: Vec::new(),
            turn: 0,
            status: GameStatus::Ready,
            winner: None,
            draw: false,
            moves: Vec::new(),
            started_at: None,
        }
    }

    /// Seats `players` in order and begins play from the opening position.
    ///
    /// # Errors
    /// [`RuleError::InvalidPlayerCount`] unless exactly two players are given.
    pub fn start(&mut self, players: &[UserId], at: SystemTime) -> Result<(), RuleError> {
        if players.len() != 2 {
            return Err(RuleError::InvalidPlayerCount {
                game: self.game_type,
                got: players.len(),
            });
        }
        self.engine = Engine::fresh(self.game_type);
        self.players = players.to_vec();
        self.turn = 0;
        self.status = GameStatus::InProgress;
        self.winner = None;
        self.draw = false;
        self.moves.clear();
        self.started_at = Some(at);
        Ok(())
    }

    /// Validates and applies `mv` for `player`.
    ///
    /// Rule-engine failures pass through unchanged, and a failed move
    /// leaves the session exactly as it was.
    pub fn apply_move(&mut self, player: UserId, mv: &GameMove) -> Result<MoveRecord, RuleError> {
        if self.status != GameStatus::InProgress {
            return Err(RuleError::NotInProgress);
        }
        if self.players.get(self.turn) != Some(&player) {
            return Err(RuleError::TurnViolation);
        }

        let seat = self.turn;
        let game_type = self.game_type;
        let (detail, finished, draw) = match (&mut self.engine, *mv) {
            (Engine::FiveInRow(board), GameMove::Stone { x, y }) => {
                let stone = Stone::for_seat(seat);
                let placement = board.place(stone, x, y)?;
                (
                    MoveDetail::Stone { x, y, stone },
                    placement != Placement::Open,
                    placement == Placement::BoardFull,
                )
            }
            (
                Engine::ChineseChess(game),
                GameMove::Piece {
                    from_row,
                    from_col,
                    to_row,
                    to_col,
                },
            ) => {
                let color = PieceColor::for_seat(seat);
                let ply = game.play(color, (from_row, from_col), (to_row, to_col))?;
                let detail = MoveDetail::Piece {
                    from_row,
                    from_col,
                    to_row,
                    to_col,
                    piece: ply.piece.kind,
                    color: ply.piece.color,
                    captured: ply.captured.map(|p: Piece| p.kind),
                    captured_color: ply.captured.map(|p: Piece| p.color),
                    is_check: ply.gives_check,
                };
                (detail, ply.outcome != PlyOutcome::Continue, false)
            }
            _ => return Err(RuleError::PayloadMismatch(game_type)),
        };

        let record = MoveRecord {
            move_number: self.moves.len() + 1,
            player_id: player,
            detail,
        };
        self.moves.push(record.clone());

        if draw {
            self.status = GameStatus::Finished;
            self.draw = true;
        } else if finished {
            self.status = GameStatus::Finished;
            self.winner = Some(player);
        } else {
            self.turn = (self.turn + 1) % self.players.len();
        }
        Ok(record)
    }

    /// Ends a running game in favour of `winner` without touching the
    /// board. Returns `false` (and does nothing) unless in progress.
    pub fn force_win(&mut self, winner: UserId) -> bool {
        if self.status != GameStatus::InProgress {
            return false;
        }
        self.status = GameStatus::Finished;
        self.winner = Some(winner);
        true
    }

    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// The player to move; `None` unless the game is in progress.
    pub fn current_player_id(&self) -> Option<UserId> {
        if self.status == GameStatus::InProgress {
            self.players.get(self.turn).copied()
        } else {
            None
        }
    }

    pub fn player_order(&self) -> &[UserId] {
        &self.players
    }

    pub fn winner(&self) -> Option<UserId> {
        self.winner
    }

    pub fn is_draw(&self) -> bool {
        self.draw
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let (board, current_player_color) = match &self.engine {
            Engine::FiveInRow(board) => (
                BoardSnapshot::Stones {
                    board_size: gomoku::BOARD_SIZE,
                    cells: board.codes(),
                },
                None,
            ),
            Engine::ChineseChess(game) => (
                BoardSnapshot::Pieces {
                    cells: game.board().views(),
                },
                Some(PieceColor::for_seat(self.turn)),
            ),
        };

        GameSnapshot {
            game_type: self.game_type,
            status: self.status,
            board,
            moves: self.moves.clone(),
            player_order: self.players.clone(),
            current_player_id: self.current_player_id(),
            current_player_color,
            winner_id: self.winner,
            draw: self.draw,
            started_at_ms: self.started_at.map(epoch_millis),
        }
    }
}
