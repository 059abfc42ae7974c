use anyhow::ensure;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIE_BREAK_PROBABILITY: f64 = 0.5;
pub const DEFAULT_CACHE_CAPACITY: usize = 5000;
/// Deeper searches can't see anything new on a regular board.
pub const MAX_SEARCH_DEPTH: u32 = 64;

/// Strength presets of the computer player.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Weak,
    #[default]
    Intermediate,
    Strong,
}

impl Level {
    /// Search depth in plies.
    pub fn depth(self) -> u32 {
        match self {
            Level::Weak => 4,
            Level::Intermediate => 5,
            Level::Strong => 6,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    pub depth: u32,
    /// Chance that a column scoring as well as the best one so far replaces it.
    pub tie_break_probability: f64,
    /// Entries kept in the transposition cache. Zero disables the cache.
    pub cache_capacity: usize,
}

impl SearchConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_SEARCH_DEPTH).contains(&self.depth),
            "The search depth must be between 1 and {}, got {}",
            MAX_SEARCH_DEPTH,
            self.depth
        );
        ensure!(
            (0.0..=1.0).contains(&self.tie_break_probability),
            "The tie-break probability must be between 0 and 1, got {}",
            self.tie_break_probability
        );
        Ok(())
    }
}

impl From<Level> for SearchConfig {
    fn from(level: Level) -> Self {
        Self {
            depth: level.depth(),
            tie_break_probability: DEFAULT_TIE_BREAK_PROBABILITY,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Level::default().into()
    }
}
