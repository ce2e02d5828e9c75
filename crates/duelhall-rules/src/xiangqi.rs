//! Chinese chess (xiangqi) on a 10×9 board.
//!
//! Rows run `0..10` top to bottom, columns `0..9` left to right. Black
//! sets up on rows 0–3, Red on rows 6–9, and the river lies between rows
//! 4 and 5. Seat 0 plays Red and moves first.
//!
//! # Legality
//!
//! Everything funnels through one predicate, [`Board::is_pseudo_legal`],
//! which answers "could this piece make this step on this board?" without
//! looking at checks. Check detection asks the same predicate whether any
//! opposing piece can step onto the general, and full legality asks it
//! again on the board *after* the move. [`Board`] is `Copy`, so that
//! after-position is a fresh value: the live board is only replaced once
//! a move has passed every test, and a rejected move leaves it untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RuleError;

pub const ROWS: usize = 10;
pub const COLS: usize = 9;

// ---------------------------------------------------------------------------
// Pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceColor {
    Red,
    Black,
}

impl PieceColor {
    /// The colour played by the given seat (0 or 1).
    pub fn for_seat(seat: usize) -> Self {
        if seat == 0 { Self::Red } else { Self::Black }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Black,
            Self::Black => Self::Red,
        }
    }

    /// Row delta of a forward step.
    fn forward(self) -> i32 {
        match self {
            Self::Red => -1,
            Self::Black => 1,
        }
    }

    /// Whether `row` is on this colour's side of the river.
    fn home_side(self, row: usize) -> bool {
        match self {
            Self::Red => row >= 5,
            Self::Black => row <= 4,
        }
    }

    fn in_palace(self, square: Square) -> bool {
        let rows = match self {
            Self::Red => 7..=9,
            Self::Black => 0..=2,
        };
        rows.contains(&square.row) && (3..=5).contains(&square.col)
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Red => "R",
            Self::Black => "B",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceKind {
    General,
    Advisor,
    Elephant,
    Horse,
    Chariot,
    Cannon,
    Soldier,
}

impl PieceKind {
    /// Three-letter tag used in piece symbols.
    pub fn code(self) -> &'static str {
        match self {
            Self::General => "GEN",
            Self::Advisor => "ADV",
            Self::Elephant => "ELE",
            Self::Horse => "HOR",
            Self::Chariot => "CAR",
            Self::Cannon => "CAN",
            Self::Soldier => "SOL",
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::General => "GENERAL",
            Self::Advisor => "ADVISOR",
            Self::Elephant => "ELEPHANT",
            Self::Horse => "HORSE",
            Self::Chariot => "CHARIOT",
            Self::Cannon => "CANNON",
            Self::Soldier => "SOLDIER",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: PieceColor,
}

impl Piece {
    pub const fn new(kind: PieceKind, color: PieceColor) -> Self {
        Self { kind, color }
    }

    /// E.g. `"R-GEN"`, `"B-HOR"`.
    pub fn symbol(&self) -> String {
        format!("{}-{}", self.color.prefix(), self.kind.code())
    }
}

/// A piece as it appears in a board snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieceView {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub color: PieceColor,
    pub symbol: String,
}

impl From<Piece> for PieceView {
    fn from(piece: Piece) -> Self {
        Self {
            kind: piece.kind,
            color: piece.color,
            symbol: piece.symbol(),
        }
    }
}

// ---------------------------------------------------------------------------
// Squares
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub row: usize,
    pub col: usize,
}

impl Square {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Validates signed coordinates from a move payload.
    ///
    /// # Errors
    /// [`RuleError::OutOfRange`] if either coordinate is off the board.
    pub fn checked(row: i32, col: i32) -> Result<Self, RuleError> {
        match (usize::try_from(row), usize::try_from(col)) {
            (Ok(r), Ok(c)) if r < ROWS && c < COLS => Ok(Self::new(r, c)),
            _ => Err(RuleError::OutOfRange { row, col }),
        }
    }

    /// The square `(dr, dc)` away. Only called with offsets that stay
    /// between two on-board squares.
    fn offset(self, dr: i32, dc: i32) -> Self {
        Self::new(
            (self.row as i32 + dr) as usize,
            (self.col as i32 + dc) as usize,
        )
    }

    fn all() -> impl Iterator<Item = Square> {
        (0..ROWS).flat_map(|row| (0..COLS).map(move |col| Square::new(row, col)))
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

const BACK_RANK: [PieceKind; COLS] = [
    PieceKind::Chariot,
    PieceKind::Horse,
    PieceKind::Elephant,
    PieceKind::Advisor,
    PieceKind::General,
    PieceKind::Advisor,
    PieceKind::Elephant,
    PieceKind::Horse,
    PieceKind::Chariot,
];

/// A complete position. Small and `Copy`: candidate positions are
/// produced by value, never by mutating the live board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Piece>; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::opening()
    }
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    /// The standard starting position.
    pub fn opening() -> Self {
        use PieceColor::{Black, Red};
        use PieceKind::{Cannon, Soldier};

        let mut board = Self::empty();
        for (col, kind) in BACK_RANK.into_iter().enumerate() {
            board.put(Square::new(0, col), Some(Piece::new(kind, Black)));
            board.put(Square::new(9, col), Some(Piece::new(kind, Red)));
        }
        for col in [1, 7] {
            board.put(Square::new(2, col), Some(Piece::new(Cannon, Black)));
            board.put(Square::new(7, col), Some(Piece::new(Cannon, Red)));
        }
        for col in (0..COLS).step_by(2) {
            board.put(Square::new(3, col), Some(Piece::new(Soldier, Black)));
            board.put(Square::new(6, col), Some(Piece::new(Soldier, Red)));
        }
        board
    }

    /// Builder-style placement, handy for setting up positions.
    pub fn with(mut self, square: Square, piece: Piece) -> Self {
        self.put(square, Some(piece));
        self
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        self.cells[square.row][square.col]
    }

    pub fn put(&mut self, square: Square, piece: Option<Piece>) {
        self.cells[square.row][square.col] = piece;
    }

    /// Every occupied square with its piece, row-major.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|square| self.get(square).map(|piece| (square, piece)))
    }

    /// The position after moving whatever stands on `from` to `to`,
    /// replacing anything on `to`.
    pub fn after_move(&self, from: Square, to: Square) -> Board {
        let mut next = *self;
        let piece = next.cells[from.row][from.col].take();
        next.cells[to.row][to.col] = piece;
        next
    }

    pub fn general(&self, color: PieceColor) -> Option<Square> {
        self.pieces()
            .find(|(_, piece)| piece.kind == PieceKind::General && piece.color == color)
            .map(|(square, _)| square)
    }

    /// Both generals on one file with nothing between them.
    pub fn generals_facing(&self) -> bool {
        match (self.general(PieceColor::Red), self.general(PieceColor::Black)) {
            (Some(red), Some(black)) => {
                red.col == black.col && self.pieces_between(red, black) == 0
            }
            _ => false,
        }
    }

    /// Whether any opposing piece could step onto `color`'s general.
    /// A side without a general is not in check.
    pub fn is_in_check(&self, color: PieceColor) -> bool {
        let Some(general) = self.general(color) else {
            return false;
        };
        self.pieces()
            .filter(|(_, piece)| piece.color == color.opponent())
            .any(|(square, _)| self.is_pseudo_legal(square, general))
    }

    /// Movement rules for the piece on `from`, ignoring checks.
    ///
    /// False for an empty source, a null move, or a destination holding
    /// a piece of the mover's own colour.
    pub fn is_pseudo_legal(&self, from: Square, to: Square) -> bool {
        let Some(piece) = self.get(from) else {
            return false;
        };
        if from == to {
            return false;
        }
        let target = self.get(to);
        if target.is_some_and(|t| t.color == piece.color) {
            return false;
        }

        let dr = to.row as i32 - from.row as i32;
        let dc = to.col as i32 - from.col as i32;
        let (adr, adc) = (dr.abs(), dc.abs());

        match piece.kind {
            PieceKind::General => adr + adc == 1 && piece.color.in_palace(to),
            PieceKind::Advisor => adr == 1 && adc == 1 && piece.color.in_palace(to),
            PieceKind::Elephant => {
                adr == 2
                    && adc == 2
                    && piece.color.home_side(to.row)
                    && self.get(from.offset(dr / 2, dc / 2)).is_none()
            }
            PieceKind::Horse => match (adr, adc) {
                (2, 1) => self.get(from.offset(dr / 2, 0)).is_none(),
                (1, 2) => self.get(from.offset(0, dc / 2)).is_none(),
                _ => false,
            },
            PieceKind::Chariot => (dr == 0 || dc == 0) && self.pieces_between(from, to) == 0,
            PieceKind::Cannon => {
                let screens = if target.is_some() { 1 } else { 0 };
                (dr == 0 || dc == 0) && self.pieces_between(from, to) == screens
            }
            PieceKind::Soldier => {
                let forward = dr == piece.color.forward() && dc == 0;
                let sideways =
                    !piece.color.home_side(from.row) && dr == 0 && adc == 1;
                forward || sideways
            }
        }
    }

    /// Why moving `from → to` would be illegal for the mover, judged on
    /// the position after the move. `None` means the move is safe.
    pub fn exposure(&self, from: Square, to: Square) -> Option<RuleError> {
        let piece = self.get(from)?;
        let next = self.after_move(from, to);
        if next.generals_facing() {
            Some(RuleError::FlyingGenerals)
        } else if next.is_in_check(piece.color) {
            Some(RuleError::SelfCheck)
        } else {
            None
        }
    }

    /// Whether `color` has at least one move that does not leave its own
    /// general exposed.
    pub fn has_legal_move(&self, color: PieceColor) -> bool {
        self.pieces()
            .filter(|(_, piece)| piece.color == color)
            .any(|(from, _)| {
                Square::all().any(|to| {
                    self.is_pseudo_legal(from, to) && self.exposure(from, to).is_none()
                })
            })
    }

    /// Rows of optional piece views, row-major.
    pub fn views(&self) -> Vec<Vec<Option<PieceView>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.map(PieceView::from)).collect())
            .collect()
    }

    /// Occupied squares strictly between two squares on one row or file.
    fn pieces_between(&self, from: Square, to: Square) -> usize {
        let step_r = (to.row as i32 - from.row as i32).signum();
        let step_c = (to.col as i32 - from.col as i32).signum();
        let mut count = 0;
        let mut square = from.offset(step_r, step_c);
        while square != to {
            if self.get(square).is_some() {
                count += 1;
            }
            square = square.offset(step_r, step_c);
        }
        count
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// How an accepted move left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyOutcome {
    Continue,
    /// The mover took the opposing general.
    GeneralCaptured,
    /// The opponent has no safe reply. Checkmate and stalemate alike
    /// count as a win for the mover.
    OpponentStuck,
}

/// An accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ply {
    pub piece: Piece,
    pub captured: Option<Piece>,
    /// The opponent is in check after this move.
    pub gives_check: bool,
    pub outcome: PlyOutcome,
}

/// Chinese chess engine: a board plus the move validation pipeline.
/// Turn order lives in the game session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChineseChess {
    board: Board,
}

impl ChineseChess {
    /// A game at the opening position.
    pub fn new() -> Self {
        Self::default()
    }

    /// A game continuing from an arbitrary position.
    pub fn from_board(board: Board) -> Self {
        Self { board }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Plays a move for `color`.
    ///
    /// Checks run in order: bounds, source occupancy, ownership, own
    /// capture, piece movement, flying generals, self-check. The first
    /// failure is returned and the board is not touched.
    pub fn play(
        &mut self,
        color: PieceColor,
        from: (i32, i32),
        to: (i32, i32),
    ) -> Result<Ply, RuleError> {
        let from = Square::checked(from.0, from.1)?;
        let to = Square::checked(to.0, to.1)?;

        let piece = self.board.get(from).ok_or(RuleError::EmptySource)?;
        if piece.color != color {
            return Err(RuleError::OpponentPiece);
        }
        let captured = self.board.get(to);
        if captured.is_some_and(|target| target.color == color) {
            return Err(RuleError::OwnCapture);
        }
        if !self.board.is_pseudo_legal(from, to) {
            return Err(RuleError::IllegalMove(piece.kind));
        }
        if let Some(err) = self.board.exposure(from, to) {
            return Err(err);
        }

        self.board = self.board.after_move(from, to);

        let opponent = color.opponent();
        let outcome = if captured.is_some_and(|c| c.kind == PieceKind::General) {
            PlyOutcome::GeneralCaptured
        } else if !self.board.has_legal_move(opponent) {
            PlyOutcome::OpponentStuck
        } else {
            PlyOutcome::Continue
        };

        Ok(Ply {
            piece,
            captured,
            gives_check: self.board.is_in_check(opponent),
            outcome,
        })
    }
}
