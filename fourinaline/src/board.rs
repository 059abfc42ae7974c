use serde::{Deserialize, Serialize};

use crate::{EmptyHistory, IllegalMove, PlayerMark};

pub const DEFAULT_ROWS: usize = 6;
pub const DEFAULT_COLS: usize = 7;

/// How many contiguous marks win the game.
pub const WINNING_RUN: usize = 4;

// Horizontal, vertical, diagonal, anti-diagonal. The win scan visits them in this order.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// A cell position. Row 0 is the bottom row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub column: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GameStatus {
    Continue,
    /// `line` is the contiguous run through the last played cell, ordered from one end to the other.
    Won { mark: PlayerMark, line: Vec<Coord> },
    Tie,
}

/// The grid of a game, together with whose turn it is and how it got there.
///
/// [`Board::play()`] and [`Board::undo_last_play()`] are the only ways to change it.
/// Equality compares everything, including the move history, which is what the
/// server relies on to reject moves submitted against a stale copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    rows: usize,
    cols: usize,
    /// Row-major, bottom row first.
    cells: Vec<Option<PlayerMark>>,
    /// How many marks each column holds. Derived from `cells`.
    heights: Vec<usize>,
    current_player: PlayerMark,
    /// Column of every move so far, oldest first.
    history: Vec<usize>,
    status: GameStatus,
}

/// Hashable encoding of the cells and the side to move.
///
/// Two boards have equal keys exactly when they hold the same marks in the same cells and
/// the same player is to move. History is not part of it, so different move orders that
/// reach the same position share a key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoardKey {
    cols: usize,
    cells: Box<[u8]>,
}

impl Board {
    /// An empty board of the standard 6 x 7 size.
    pub fn new() -> Self {
        Self::with_size(DEFAULT_ROWS, DEFAULT_COLS)
    }

    /// An empty board with the given dimensions.
    ///
    /// Panics if either dimension is zero.
    pub fn with_size(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "board must have at least one cell");
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
            heights: vec![0; cols],
            current_player: PlayerMark::ALL[0],
            history: Vec::new(),
            status: GameStatus::Continue,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The mark at the given position, or `None` if the cell is empty or outside the grid.
    pub fn get(&self, row: usize, column: usize) -> Option<PlayerMark> {
        if row >= self.rows || column >= self.cols {
            return None;
        }
        self.cells[row * self.cols + column]
    }

    /// Whose turn it is. Once the game is over, this stays on the player who made the last move.
    pub fn current_player(&self) -> PlayerMark {
        self.current_player
    }

    pub fn status(&self) -> &GameStatus {
        &self.status
    }

    pub fn is_over(&self) -> bool {
        self.status != GameStatus::Continue
    }

    pub fn winner(&self) -> Option<PlayerMark> {
        match self.status {
            GameStatus::Won { mark, .. } => Some(mark),
            _ => None,
        }
    }

    pub fn winning_line(&self) -> Option<&[Coord]> {
        match &self.status {
            GameStatus::Won { line, .. } => Some(line),
            _ => None,
        }
    }

    /// The columns played so far, oldest first.
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn occupied_count(&self) -> usize {
        self.history.len()
    }

    pub fn column_height(&self, column: usize) -> usize {
        self.heights.get(column).copied().unwrap_or(self.rows)
    }

    pub fn is_playable(&self, column: usize) -> bool {
        column < self.cols && self.heights[column] < self.rows
    }

    pub fn is_full(&self) -> bool {
        self.history.len() == self.rows * self.cols
    }

    /// The columns that still have room, in ascending order.
    pub fn playable_columns(&self) -> Vec<usize> {
        (0..self.cols).filter(|&c| self.is_playable(c)).collect()
    }

    /// Drops `mark` into `column` and updates the game status.
    ///
    /// Returns the cell the mark landed in.
    pub fn play(&mut self, column: usize, mark: PlayerMark) -> Result<Coord, IllegalMove> {
        if self.status != GameStatus::Continue {
            return Err(IllegalMove::GameOver);
        }
        if column >= self.cols {
            return Err(IllegalMove::ColumnOutOfRange {
                column,
                cols: self.cols,
            });
        }
        if mark != self.current_player {
            return Err(IllegalMove::NotYourTurn {
                expected: self.current_player,
                played: mark,
            });
        }
        let row = self.heights[column];
        if row >= self.rows {
            return Err(IllegalMove::ColumnFull { column });
        }

        self.cells[row * self.cols + column] = Some(mark);
        self.heights[column] += 1;
        self.history.push(column);

        let placed = Coord { row, column };
        if let Some(line) = self.run_through(placed, mark) {
            self.status = GameStatus::Won { mark, line };
        } else if self.is_full() {
            self.status = GameStatus::Tie;
        } else {
            self.current_player = mark.next();
        }
        Ok(placed)
    }

    /// Takes back the most recent move and returns its column.
    ///
    /// The player who made that move is to move again, and the status goes back to
    /// [`GameStatus::Continue`].
    pub fn undo_last_play(&mut self) -> Result<usize, EmptyHistory> {
        let column = self.history.pop().ok_or(EmptyHistory)?;
        self.heights[column] -= 1;
        let idx = self.heights[column] * self.cols + column;
        if let Some(mark) = self.cells[idx].take() {
            self.current_player = mark;
        }
        self.status = GameStatus::Continue;
        Ok(column)
    }

    pub fn canonical_key(&self) -> BoardKey {
        let mut cells = Vec::with_capacity(self.cells.len() + 1);
        cells.extend(self.cells.iter().map(|cell| match cell {
            None => 0,
            Some(mark) => mark.index() as u8 + 1,
        }));
        cells.push(self.current_player.index() as u8);
        BoardKey {
            cols: self.cols,
            cells: cells.into_boxed_slice(),
        }
    }

    // Finds a run of at least WINNING_RUN marks through `placed`, checking the
    // directions in DIRECTIONS order.
    fn run_through(&self, placed: Coord, mark: PlayerMark) -> Option<Vec<Coord>> {
        for (dr, dc) in DIRECTIONS {
            // Walk backwards to one end of the run, then collect it forwards.
            let mut start = placed;
            while let Some(prev) = self.step(start, -dr, -dc) {
                if self.get(prev.row, prev.column) != Some(mark) {
                    break;
                }
                start = prev;
            }
            let mut line = vec![start];
            let mut cursor = start;
            while let Some(next) = self.step(cursor, dr, dc) {
                if self.get(next.row, next.column) != Some(mark) {
                    break;
                }
                line.push(next);
                cursor = next;
            }
            if line.len() >= WINNING_RUN {
                return Some(line);
            }
        }
        None
    }

    fn step(&self, from: Coord, dr: isize, dc: isize) -> Option<Coord> {
        let row = from.row.checked_add_signed(dr)?;
        let column = from.column.checked_add_signed(dc)?;
        (row < self.rows && column < self.cols).then_some(Coord { row, column })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::visualize_board(self))
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::quickcheck;

    use super::*;
    use crate::arbitrary::MoveSequence;

    use PlayerMark::{Red, Yellow};

    // Plays the columns in order, alternating marks, and panics on any illegal move.
    fn board_from_moves(columns: &[usize]) -> Board {
        let mut board = Board::new();
        for &column in columns {
            let mark = board.current_player();
            board.play(column, mark).unwrap();
        }
        board
    }

    fn coords(cells: &[(usize, usize)]) -> Vec<Coord> {
        cells
            .iter()
            .map(|&(row, column)| Coord { row, column })
            .collect()
    }

    quickcheck! {
        fn occupied_cells_match_successful_plays(moves: MoveSequence) -> bool {
            let mut board = Board::new();
            let mut successful = 0;
            for column in moves.0 {
                let mark = board.current_player();
                if board.play(column, mark).is_ok() {
                    successful += 1;
                }
            }
            let occupied = (0..board.rows())
                .flat_map(|r| (0..board.cols()).map(move |c| (r, c)))
                .filter(|&(r, c)| board.get(r, c).is_some())
                .count();
            occupied == successful && board.occupied_count() == successful
        }

        fn undo_restores_previous_position(moves: MoveSequence) -> bool {
            let mut board = Board::new();
            for column in moves.0 {
                if board.is_over() {
                    break;
                }
                let before = board.clone();
                let mark = board.current_player();
                if board.play(column, mark).is_err() {
                    continue;
                }
                let mut undone = board.clone();
                if undone.undo_last_play() != Ok(column) || undone != before {
                    return false;
                }
            }
            true
        }

        fn column_heights_never_exceed_rows(moves: MoveSequence) -> bool {
            let mut board = Board::new();
            for column in moves.0 {
                let mark = board.current_player();
                let _ = board.play(column, mark);
            }
            (0..board.cols()).all(|c| board.column_height(c) <= board.rows())
        }
    }

    #[test]
    fn marks_stack_from_the_bottom() {
        let mut board = Board::new();
        assert_eq!(board.play(3, Red), Ok(Coord { row: 0, column: 3 }));
        assert_eq!(board.play(3, Yellow), Ok(Coord { row: 1, column: 3 }));
        assert_eq!(board.get(0, 3), Some(Red));
        assert_eq!(board.get(1, 3), Some(Yellow));
        assert_eq!(board.current_player(), Red);
        assert_eq!(board.history(), &[3, 3]);
    }

    #[test]
    fn rejects_illegal_moves() {
        let mut board = Board::new();
        assert_eq!(
            board.play(7, Red),
            Err(IllegalMove::ColumnOutOfRange { column: 7, cols: 7 })
        );
        assert_eq!(
            board.play(0, Yellow),
            Err(IllegalMove::NotYourTurn {
                expected: Red,
                played: Yellow
            })
        );
        for _ in 0..DEFAULT_ROWS {
            let mark = board.current_player();
            board.play(0, mark).unwrap();
        }
        let mark = board.current_player();
        assert_eq!(board.play(0, mark), Err(IllegalMove::ColumnFull { column: 0 }));
        assert_eq!(board.occupied_count(), DEFAULT_ROWS);
        assert!(!board.playable_columns().contains(&0));
    }

    #[test]
    fn vertical_win_in_center_column() {
        // Red keeps dropping into column 3, Yellow answers elsewhere.
        let board = board_from_moves(&[3, 0, 3, 1, 3, 0, 3]);
        assert_eq!(board.winner(), Some(Red));
        assert_eq!(
            board.winning_line(),
            Some(coords(&[(0, 3), (1, 3), (2, 3), (3, 3)]).as_slice())
        );
        assert_eq!(board.current_player(), Red);
        let mut finished = board.clone();
        assert_eq!(finished.play(4, Red), Err(IllegalMove::GameOver));
    }

    #[test]
    fn horizontal_win() {
        let board = board_from_moves(&[0, 0, 1, 1, 2, 2, 3]);
        assert_eq!(board.winner(), Some(Red));
        assert_eq!(
            board.winning_line(),
            Some(coords(&[(0, 0), (0, 1), (0, 2), (0, 3)]).as_slice())
        );
    }

    #[test]
    fn horizontal_win_filling_the_gap() {
        // The winning mark lands in the middle of the run.
        let board = board_from_moves(&[0, 0, 1, 1, 3, 3, 2]);
        assert_eq!(
            board.winning_line(),
            Some(coords(&[(0, 0), (0, 1), (0, 2), (0, 3)]).as_slice())
        );
    }

    #[test]
    fn diagonal_win() {
        // Red: (0,0) (1,1) (2,2) (3,3)
        let board = board_from_moves(&[0, 1, 1, 2, 2, 3, 2, 3, 3, 6, 3]);
        assert_eq!(board.winner(), Some(Red));
        assert_eq!(
            board.winning_line(),
            Some(coords(&[(0, 0), (1, 1), (2, 2), (3, 3)]).as_slice())
        );
    }

    #[test]
    fn anti_diagonal_win() {
        // Red: (0,6) (1,5) (2,4) (3,3)
        let board = board_from_moves(&[6, 5, 5, 4, 4, 3, 4, 3, 3, 0, 3]);
        assert_eq!(board.winner(), Some(Red));
        assert_eq!(
            board.winning_line(),
            Some(coords(&[(0, 6), (1, 5), (2, 4), (3, 3)]).as_slice())
        );
    }

    #[test]
    fn three_in_a_row_does_not_win() {
        let board = board_from_moves(&[0, 0, 1, 1, 2]);
        assert_eq!(board.status(), &GameStatus::Continue);
        assert_eq!(board.winning_line(), None);
        assert_eq!(board.current_player(), Yellow);
    }

    #[test]
    fn run_longer_than_four_is_reported_whole() {
        // Red holds 0, 1, 2 and 4 on the bottom row, then fills 3.
        let board = board_from_moves(&[0, 0, 1, 1, 4, 4, 2, 2, 3]);
        assert_eq!(board.winner(), Some(Red));
        assert_eq!(
            board.winning_line(),
            Some(coords(&[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]).as_slice())
        );
    }

    #[test]
    fn full_board_without_a_line_is_a_tie() {
        // Column c holds alternating marks, starting with Red at the bottom when
        // c is 0, 1, 4 or 5. No four marks line up anywhere.
        let mut moves = Vec::new();
        for (a, b) in [(0, 2), (1, 3), (4, 6)] {
            for _ in 0..3 {
                moves.extend([a, b, b, a]);
            }
        }
        moves.extend([5; 6]);
        let board = board_from_moves(&moves);
        assert_eq!(board.status(), &GameStatus::Tie);
        assert!(board.is_full());
        assert!(board.playable_columns().is_empty());
    }

    #[test]
    fn undo_after_win_reopens_the_game() {
        let mut board = board_from_moves(&[3, 0, 3, 1, 3, 0]);
        let before = board.clone();
        board.play(3, Red).unwrap();
        assert!(board.is_over());
        assert_eq!(board.undo_last_play(), Ok(3));
        assert_eq!(board, before);
    }

    #[test]
    fn undo_on_empty_board_fails() {
        let mut board = Board::new();
        assert_eq!(board.undo_last_play(), Err(EmptyHistory));
    }

    #[test]
    fn canonical_key_ignores_move_order() {
        let a = board_from_moves(&[0, 1, 2, 3]);
        let b = board_from_moves(&[2, 3, 0, 1]);
        assert_ne!(a, b);
        assert_eq!(a.canonical_key(), b.canonical_key());

        let c = board_from_moves(&[0, 1, 2]);
        assert_ne!(a.canonical_key(), c.canonical_key());
    }

    #[test]
    fn copies_are_independent() {
        let original = board_from_moves(&[3, 3]);
        let mut copy = original.clone();
        copy.play(4, Red).unwrap();
        assert_eq!(original.occupied_count(), 2);
        assert_eq!(original.get(0, 4), None);
    }

    #[test]
    fn small_boards_are_supported() {
        let mut board = Board::with_size(4, 4);
        for column in [0, 1, 0, 1, 0, 1] {
            let mark = board.current_player();
            board.play(column, mark).unwrap();
        }
        assert_eq!(board.winner(), None);
        board.play(0, Red).unwrap();
        assert_eq!(board.winner(), Some(Red));
    }

    #[test]
    fn serde_round_trip_keeps_equality() {
        let board = board_from_moves(&[3, 2, 4, 4]);
        let json = serde_json::to_string(&board).unwrap();
        let decoded: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, board);
    }
}
