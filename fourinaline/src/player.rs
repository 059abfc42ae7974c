use serde::{Deserialize, Serialize};

use crate::PlayerMark;

/// Read-only view of a registered player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    name: String,
    mark: PlayerMark,
    /// Matches won since registration.
    score: u32,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, mark: PlayerMark, score: u32) -> Self {
        Self {
            name: name.into(),
            mark,
            score,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mark(&self) -> PlayerMark {
        self.mark
    }

    pub fn score(&self) -> u32 {
        self.score
    }
}

impl std::fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, score {})", self.name, self.mark, self.score)
    }
}

/// What a successful registration returns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDescriptor {
    pub player: PlayerRecord,
    /// The first player to register owns the match and is the only one who may start or end it.
    pub is_owner: bool,
}
