use fourinaline::{Board, BoardKey, GameStatus, PlayerMark};
use fourinaline_bot_utils::Bot;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, trace};

use crate::{BoundedCache, Evaluator, SearchConfig, WindowEvaluator};

/// Score of a win found at the search horizon. Wins found sooner score higher.
pub const WIN_SCORE: i32 = 1_000_000;

const INFINITY: i32 = i32::MAX - 1;

/// Heuristic scores are clamped to this, so that they never reach a win.
const MAX_HEURISTIC: i32 = WIN_SCORE / 2;

/// Columns ordered from the center outwards, right before left: 3, 4, 2, 5, 1, 6, 0.
pub fn center_out_order(cols: usize) -> Vec<usize> {
    let Some(center) = cols.checked_sub(1).map(|last| last / 2) else {
        return Vec::new();
    };
    (0..cols)
        .map(|i| {
            if i % 2 == 1 {
                center + (i + 1) / 2
            } else {
                center - i / 2
            }
        })
        .collect()
}

/// Negamax search with alpha-beta pruning, to a fixed depth.
///
/// Exact node values are kept in a bounded cache across moves. Among the root moves with
/// the best score, each later one (in center-out order) replaces the current pick with
/// the configured probability.
pub struct AlphaBeta<E = WindowEvaluator> {
    config: SearchConfig,
    evaluator: E,
    cache: BoundedCache<(BoardKey, u32), i32>,
    rng: StdRng,
    stats: SearchStats,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub cache_hits: u64,
}

impl<E: Evaluator> AlphaBeta<E> {
    pub fn new(config: SearchConfig, evaluator: E, rng: StdRng) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: BoundedCache::new(config.cache_capacity),
            config,
            evaluator,
            rng,
            stats: SearchStats::default(),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Counters of the last search.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Picks a column for the player to move, or `None` if the game is over.
    pub fn choose_column(&mut self, board: &Board) -> Option<usize> {
        self.best_move(board).map(|(column, _)| column)
    }

    /// Like [`AlphaBeta::choose_column()`], with the score of the picked column from
    /// the mover's point of view.
    pub fn best_move(&mut self, board: &Board) -> Option<(usize, i32)> {
        if board.is_over() {
            return None;
        }
        self.stats = SearchStats::default();
        let depth = self.config.depth;
        let mut board = board.clone();
        let mover = board.current_player();
        let mut best: Option<(usize, i32)> = None;

        for column in center_out_order(board.cols()) {
            if !board.is_playable(column) || board.play(column, mover).is_err() {
                continue;
            }
            let score = match best {
                None => self.score_after_move(&mut board, depth, -INFINITY, INFINITY),
                // Anything below the best so far is rejected either way, so only a score
                // at least as good needs to be exact.
                Some((_, best_score)) => {
                    self.score_after_move(&mut board, depth, best_score - 1, INFINITY)
                }
            };
            undo(&mut board);
            trace!(column, score, "Root move scored");

            best = match best {
                None => Some((column, score)),
                Some((_, best_score)) if score > best_score => Some((column, score)),
                Some((_, best_score))
                    if score == best_score
                        && self.rng.gen_bool(self.config.tie_break_probability) =>
                {
                    Some((column, score))
                }
                keep => keep,
            };
        }

        if let Some((column, score)) = best {
            debug!(
                column,
                score,
                nodes = self.stats.nodes,
                cache_hits = self.stats.cache_hits,
                "Search done"
            );
        }
        best
    }

    /// Score of the position reached by the move just played, from the point of view
    /// of the player who made it. `depth` counts that move.
    fn score_after_move(
        &mut self,
        board: &mut Board,
        depth: u32,
        alpha: i32,
        beta: i32,
    ) -> i32 {
        match board.status() {
            GameStatus::Won { .. } => WIN_SCORE + depth as i32,
            GameStatus::Tie => 0,
            GameStatus::Continue => -self.negamax(board, depth - 1, -beta, -alpha),
        }
    }

    /// Value of a running position for the player to move, searched `depth` plies deep.
    ///
    /// Fail-soft: a value at or below `alpha` is an upper bound, one at or above `beta`
    /// a lower bound. Only values strictly inside the window are exact and cached.
    fn negamax(&mut self, board: &mut Board, depth: u32, mut alpha: i32, beta: i32) -> i32 {
        self.stats.nodes += 1;
        let mover = board.current_player();
        if depth == 0 {
            return self
                .evaluator
                .evaluate(board, mover)
                .clamp(-MAX_HEURISTIC, MAX_HEURISTIC);
        }

        let key = (board.canonical_key(), depth);
        if let Some(&value) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            return value;
        }

        let alpha_orig = alpha;
        let mut best = -INFINITY;
        for column in center_out_order(board.cols()) {
            if !board.is_playable(column) || board.play(column, mover).is_err() {
                continue;
            }
            let score = self.score_after_move(board, depth, alpha, beta);
            undo(board);
            best = best.max(score);
            alpha = alpha.max(best);
            if alpha >= beta {
                break;
            }
        }

        if alpha_orig < best && best < beta {
            self.cache.insert(key, best);
        }
        best
    }
}

fn undo(board: &mut Board) {
    // Only called right after a successful play.
    let _ = board.undo_last_play();
}

impl<E: Evaluator> Bot for AlphaBeta<E> {
    fn new_match(&mut self, mark: PlayerMark) {
        debug!(%mark, depth = self.config.depth, "New match");
        // Positions of the last match won't come up again.
        self.clear_cache();
    }

    fn choose_column(&mut self, board: &Board, mark: PlayerMark) -> Option<usize> {
        if board.current_player() != mark {
            return None;
        }
        AlphaBeta::choose_column(self, board)
    }
}
