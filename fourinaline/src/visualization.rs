use crate::Board;

/// Draws the grid with the top row first. Cells of a winning line are marked with `*`.
pub fn visualize_board(board: &Board) -> String {
    let winning_line = board.winning_line().unwrap_or(&[]);

    let mut result = String::from("  ");
    for column in 0..board.cols() {
        result += &format!("{:<2}", column % 10);
    }
    result += "\n╭";
    for _ in 0..board.cols() {
        result += "──";
    }
    result += "─╮\n";

    for row in (0..board.rows()).rev() {
        result += "│";
        for column in 0..board.cols() {
            let symbol = board.get(row, column).map_or('.', |mark| mark.symbol());
            let highlighted = winning_line
                .iter()
                .any(|coord| coord.row == row && coord.column == column);
            result.push(if highlighted { '*' } else { ' ' });
            result.push(symbol);
        }
        result += " │\n";
    }

    result += "╰";
    for _ in 0..board.cols() {
        result += "──";
    }
    result += "─╯";
    result
}
