use fourinaline::{Board, PlayerMark, WINNING_RUN};

/// Scores a position that is not over yet, from the point of view of `mark`.
///
/// Higher is better for `mark`. The search clamps the result well below the score of a
/// win, so a heuristic can never outweigh a forced result.
pub trait Evaluator {
    fn evaluate(&self, board: &Board, mark: PlayerMark) -> i32;
}

/// Counts the threats in every window of [`WINNING_RUN`] cells, plus a bonus for the
/// center column(s).
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowEvaluator;

const CENTER_BONUS: i32 = 3;

impl WindowEvaluator {
    fn score_window(own: usize, opp: usize, empty: usize) -> i32 {
        match (own, opp, empty) {
            (3, 0, 1) => 50,
            (2, 0, 2) => 10,
            (0, 3, 1) => -80,
            (0, 2, 2) => -10,
            _ => 0,
        }
    }

    fn window(
        board: &Board,
        mark: PlayerMark,
        cells: impl Iterator<Item = (usize, usize)>,
    ) -> i32 {
        let (mut own, mut opp, mut empty) = (0, 0, 0);
        for (row, column) in cells {
            match board.get(row, column) {
                Some(m) if m == mark => own += 1,
                Some(_) => opp += 1,
                None => empty += 1,
            }
        }
        Self::score_window(own, opp, empty)
    }
}

impl Evaluator for WindowEvaluator {
    fn evaluate(&self, board: &Board, mark: PlayerMark) -> i32 {
        let (rows, cols) = (board.rows(), board.cols());
        let mut score = 0;

        let centers = [(cols - 1) / 2, cols / 2];
        let centers = if centers[0] == centers[1] {
            &centers[..1]
        } else {
            &centers[..]
        };
        for &column in centers {
            for row in 0..rows {
                match board.get(row, column) {
                    Some(m) if m == mark => score += CENTER_BONUS,
                    Some(_) => score -= CENTER_BONUS,
                    None => {}
                }
            }
        }

        let run = WINNING_RUN;
        if cols >= run {
            for row in 0..rows {
                for col in 0..=cols - run {
                    score += Self::window(board, mark, (0..run).map(|i| (row, col + i)));
                }
            }
        }
        if rows >= run {
            for col in 0..cols {
                for row in 0..=rows - run {
                    score += Self::window(board, mark, (0..run).map(|i| (row + i, col)));
                }
            }
        }
        if rows >= run && cols >= run {
            for row in 0..=rows - run {
                for col in 0..=cols - run {
                    score += Self::window(board, mark, (0..run).map(|i| (row + i, col + i)));
                    score += Self::window(
                        board,
                        mark,
                        (0..run).map(|i| (row + i, col + run - 1 - i)),
                    );
                }
            }
        }
        score
    }
}
