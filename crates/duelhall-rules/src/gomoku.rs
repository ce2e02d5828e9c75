//! Five-in-a-row on a 15×15 grid.
//!
//! Coordinates are `(x, y)` with `x` the row and `y` the column, both in
//! `0..15`. Seat 0 plays [`Stone::Black`] and moves first.

use serde::{Deserialize, Serialize};

use crate::RuleError;

/// Side length of the board.
pub const BOARD_SIZE: usize = 15;

/// Stones needed in one line to win.
const WINNING_RUN: usize = 5;

/// Horizontal, vertical, and both diagonals. Each axis is walked in both
/// directions from the newly placed stone.
const AXES: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    /// The stone played by the given seat (0 or 1).
    pub fn for_seat(seat: usize) -> Self {
        if seat == 0 { Self::Black } else { Self::White }
    }

    /// Compact cell encoding used in board snapshots: `1`, `-1`, `0` for empty.
    pub fn code(self) -> i8 {
        match self {
            Self::Black => 1,
            Self::White => -1,
        }
    }
}

/// What a successful placement did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Play continues.
    Open,
    /// The placed stone completed five (or more) in a row.
    FiveInRow,
    /// The last empty cell was filled without a winner.
    BoardFull,
}

/// The board and nothing else; turn order lives in the game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiveInRow {
    grid: [[Option<Stone>; BOARD_SIZE]; BOARD_SIZE],
    stones: usize,
}

impl Default for FiveInRow {
    fn default() -> Self {
        Self::new()
    }
}

impl FiveInRow {
    /// An empty board.
    pub fn new() -> Self {
        Self {
            grid: [[None; BOARD_SIZE]; BOARD_SIZE],
            stones: 0,
        }
    }

    pub fn stone_at(&self, x: usize, y: usize) -> Option<Stone> {
        self.grid.get(x).and_then(|row| row.get(y)).copied().flatten()
    }

    pub fn stone_count(&self) -> usize {
        self.stones
    }

    pub fn is_full(&self) -> bool {
        self.stones == BOARD_SIZE * BOARD_SIZE
    }

    /// Places `stone` at `(x, y)`.
    ///
    /// # Errors
    /// - [`RuleError::OutOfRange`] if either coordinate is off the board
    /// - [`RuleError::CellOccupied`] if the cell already holds a stone
    pub fn place(&mut self, stone: Stone, x: i32, y: i32) -> Result<Placement, RuleError> {
        let (row, col) = cell(x, y).ok_or(RuleError::OutOfRange { row: x, col: y })?;
        if self.grid[row][col].is_some() {
            return Err(RuleError::CellOccupied { x, y });
        }

        self.grid[row][col] = Some(stone);
        self.stones += 1;

        if self.completes_run(row, col, stone) {
            Ok(Placement::FiveInRow)
        } else if self.is_full() {
            Ok(Placement::BoardFull)
        } else {
            Ok(Placement::Open)
        }
    }

    /// Rows of cell codes (`1`, `-1`, `0`), row-major.
    pub fn codes(&self) -> Vec<Vec<i8>> {
        self.grid
            .iter()
            .map(|row| row.iter().map(|cell| cell.map_or(0, Stone::code)).collect())
            .collect()
    }

    fn completes_run(&self, row: usize, col: usize, stone: Stone) -> bool {
        AXES.iter().any(|&(dr, dc)| {
            1 + self.run_length(row, col, dr, dc, stone)
                + self.run_length(row, col, -dr, -dc, stone)
                >= WINNING_RUN
        })
    }

    /// Contiguous `stone`s starting one step away from `(row, col)`.
    fn run_length(&self, row: usize, col: usize, dr: i32, dc: i32, stone: Stone) -> usize {
        let mut count = 0;
        let (mut x, mut y) = (row as i32 + dr, col as i32 + dc);
        while let Some((r, c)) = cell(x, y) {
            if self.grid[r][c] != Some(stone) {
                break;
            }
            count += 1;
            x += dr;
            y += dc;
        }
        count
    }
}

fn cell(x: i32, y: i32) -> Option<(usize, usize)> {
    let size = BOARD_SIZE as i32;
    ((0..size).contains(&x) && (0..size).contains(&y)).then(|| (x as usize, y as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_all(board: &mut FiveInRow, stone: Stone, cells: &[(i32, i32)]) {
        for &(x, y) in cells {
            assert_eq!(board.place(stone, x, y).unwrap(), Placement::Open);
        }
    }

    #[test]
    fn test_place_on_empty_cell_is_open() {
        let mut board = FiveInRow::new();
        assert_eq!(board.place(Stone::Black, 7, 7).unwrap(), Placement::Open);
        assert_eq!(board.stone_at(7, 7), Some(Stone::Black));
        assert_eq!(board.stone_count(), 1);
    }

    #[test]
    fn test_place_occupied_cell_returns_cell_occupied() {
        let mut board = FiveInRow::new();
        board.place(Stone::Black, 3, 3).unwrap();

        let err = board.place(Stone::White, 3, 3).unwrap_err();

        assert_eq!(err, RuleError::CellOccupied { x: 3, y: 3 });
        assert_eq!(board.stone_at(3, 3), Some(Stone::Black));
        assert_eq!(board.stone_count(), 1);
    }

    #[test]
    fn test_place_out_of_range_returns_out_of_range() {
        let mut board = FiveInRow::new();
        for (x, y) in [(-1, 0), (0, -1), (15, 0), (0, 15)] {
            assert_eq!(
                board.place(Stone::Black, x, y),
                Err(RuleError::OutOfRange { row: x, col: y })
            );
        }
        assert_eq!(board.stone_count(), 0);
    }

    #[test]
    fn test_place_fifth_in_row_on_each_axis_finishes() {
        let lines: [[(i32, i32); 5]; 4] = [
            [(7, 7), (7, 8), (7, 9), (7, 10), (7, 11)],
            [(2, 4), (3, 4), (4, 4), (5, 4), (6, 4)],
            [(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)],
            [(10, 4), (9, 5), (8, 6), (7, 7), (6, 8)],
        ];
        for line in lines {
            let mut board = FiveInRow::new();
            place_all(&mut board, Stone::White, &line[..4]);
            let (x, y) = line[4];
            assert_eq!(board.place(Stone::White, x, y).unwrap(), Placement::FiveInRow);
        }
    }

    #[test]
    fn test_place_gap_filled_in_middle_counts_both_sides() {
        let mut board = FiveInRow::new();
        place_all(&mut board, Stone::Black, &[(5, 1), (5, 2), (5, 4), (5, 5)]);
        assert_eq!(board.place(Stone::Black, 5, 3).unwrap(), Placement::FiveInRow);
    }

    #[test]
    fn test_place_four_in_row_is_not_a_win() {
        let mut board = FiveInRow::new();
        place_all(&mut board, Stone::Black, &[(0, 0), (0, 1), (0, 2)]);
        assert_eq!(board.place(Stone::Black, 0, 3).unwrap(), Placement::Open);
    }

    #[test]
    fn test_place_run_broken_by_opponent_is_not_a_win() {
        let mut board = FiveInRow::new();
        place_all(&mut board, Stone::Black, &[(4, 0), (4, 1), (4, 3), (4, 4)]);
        board.place(Stone::White, 4, 2).unwrap();
        assert_eq!(board.place(Stone::Black, 4, 5).unwrap(), Placement::Open);
    }

    #[test]
    fn test_place_overline_of_six_still_wins() {
        let mut board = FiveInRow::new();
        place_all(
            &mut board,
            Stone::White,
            &[(9, 0), (9, 1), (9, 2), (9, 4), (9, 5)],
        );
        assert_eq!(board.place(Stone::White, 9, 3).unwrap(), Placement::FiveInRow);
    }

    #[test]
    fn test_place_last_cell_without_five_is_board_full() {
        // Colour pairs of columns alternately so no line ever reaches three.
        let pattern = |x: usize, y: usize| Stone::for_seat((y / 2 + x) % 2);
        let mut board = FiveInRow::new();
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                if (x, y) != (14, 14) {
                    board.grid[x][y] = Some(pattern(x, y));
                }
            }
        }
        board.stones = BOARD_SIZE * BOARD_SIZE - 1;

        let placement = board.place(pattern(14, 14), 14, 14).unwrap();

        assert_eq!(placement, Placement::BoardFull);
        assert!(board.is_full());
    }

    #[test]
    fn test_codes_encode_stones() {
        let mut board = FiveInRow::new();
        board.place(Stone::Black, 0, 0).unwrap();
        board.place(Stone::White, 0, 1).unwrap();

        let codes = board.codes();

        assert_eq!(codes.len(), BOARD_SIZE);
        assert_eq!(&codes[0][..3], &[1, -1, 0]);
    }
}
