use serde::{Deserialize, Serialize};

/// The mark a player drops into the grid.
///
/// The declaration order is the turn order: [`PlayerMark::Red`] always opens a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerMark {
    Red,
    Yellow,
}

impl PlayerMark {
    /// Every mark, in turn order.
    pub const ALL: [PlayerMark; 2] = [PlayerMark::Red, PlayerMark::Yellow];

    pub const COUNT: usize = Self::ALL.len();

    /// The mark that plays after this one.
    pub fn next(self) -> Self {
        match self {
            PlayerMark::Red => PlayerMark::Yellow,
            PlayerMark::Yellow => PlayerMark::Red,
        }
    }

    /// Position of this mark in [`PlayerMark::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn symbol(self) -> char {
        match self {
            PlayerMark::Red => 'X',
            PlayerMark::Yellow => 'O',
        }
    }
}

impl std::fmt::Display for PlayerMark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerMark::Red => write!(f, "red"),
            PlayerMark::Yellow => write!(f, "yellow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_cycles_through_all_marks() {
        for (idx, mark) in PlayerMark::ALL.into_iter().enumerate() {
            assert_eq!(mark.index(), idx);
            assert_eq!(
                mark.next(),
                PlayerMark::ALL[(idx + 1) % PlayerMark::COUNT]
            );
        }
        assert_eq!(PlayerMark::Red.next().next(), PlayerMark::Red);
    }
}
