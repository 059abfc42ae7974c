use serde::{Deserialize, Serialize};

use crate::PlayerMark;

/// The error type for [`Board::play()`](crate::Board::play).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IllegalMove {
    ColumnOutOfRange {
        column: usize,
        cols: usize,
    },
    ColumnFull {
        column: usize,
    },
    NotYourTurn {
        expected: PlayerMark,
        played: PlayerMark,
    },
    GameOver,
}

impl std::error::Error for IllegalMove {}

impl std::fmt::Display for IllegalMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IllegalMove::ColumnOutOfRange { column, cols } => write!(
                f,
                "Column {} is out of range, the board has {} columns",
                column, cols
            ),
            IllegalMove::ColumnFull { column } => write!(f, "Column {} is full", column),
            IllegalMove::NotYourTurn { expected, played } => write!(
                f,
                "It is {}'s turn, but {} tried to play",
                expected, played
            ),
            IllegalMove::GameOver => write!(f, "The game is already over"),
        }
    }
}

/// The error type for [`Board::undo_last_play()`](crate::Board::undo_last_play).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyHistory;

impl std::error::Error for EmptyHistory {}

impl std::fmt::Display for EmptyHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "No move has been played yet")
    }
}

/// Broad classes of [`ServerError`], so that clients can react to each class the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, stale or exhausted tickets.
    Capability,
    /// Calls that don't fit the current state of the match or registry.
    Protocol,
    /// Moves the board rejected.
    Rules,
    /// The call never reached the server, or its answer never came back.
    Transport,
}

/// The error type for every call on a [`GameServer`](crate::GameServer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerError {
    NoTicketAvailable,
    /// Released a ticket that is not checked out.
    UnknownTicket,
    /// Any other call made with a ticket that is not checked out.
    InvalidTicket,
    DuplicateName {
        name: String,
    },
    TooManyPlayers,
    AlreadyRegisteredTicket,
    AlreadyRunning,
    NotAllPlayersRegistered,
    NotMatchOwner,
    InvalidMove(IllegalMove),
    MatchAlreadyExists {
        name: String,
    },
    UnknownMatch {
        name: String,
    },
    RemoteCallFailed {
        reason: String,
    },
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::NoTicketAvailable
            | ServerError::UnknownTicket
            | ServerError::InvalidTicket => ErrorKind::Capability,
            ServerError::DuplicateName { .. }
            | ServerError::TooManyPlayers
            | ServerError::AlreadyRegisteredTicket
            | ServerError::AlreadyRunning
            | ServerError::NotAllPlayersRegistered
            | ServerError::NotMatchOwner
            | ServerError::MatchAlreadyExists { .. }
            | ServerError::UnknownMatch { .. } => ErrorKind::Protocol,
            ServerError::InvalidMove(_) => ErrorKind::Rules,
            ServerError::RemoteCallFailed { .. } => ErrorKind::Transport,
        }
    }

    pub fn remote(err: impl std::fmt::Display) -> Self {
        ServerError::RemoteCallFailed {
            reason: err.to_string(),
        }
    }
}

impl From<IllegalMove> for ServerError {
    fn from(err: IllegalMove) -> Self {
        ServerError::InvalidMove(err)
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::InvalidMove(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::NoTicketAvailable => write!(f, "No more ticket available"),
            ServerError::UnknownTicket => write!(f, "The released ticket is not checked out"),
            ServerError::InvalidTicket => write!(f, "Invalid server ticket"),
            ServerError::DuplicateName { name } => {
                write!(f, "There's already a player with name {}", name)
            }
            ServerError::TooManyPlayers => write!(f, "All the seats of the match are taken"),
            ServerError::AlreadyRegisteredTicket => write!(
                f,
                "The ticket has already been used to register a player"
            ),
            ServerError::AlreadyRunning => write!(f, "There's already a running game"),
            ServerError::NotAllPlayersRegistered => {
                write!(f, "Not all the players have been registered")
            }
            ServerError::NotMatchOwner => write!(f, "Only the match owner can do this"),
            ServerError::InvalidMove(_) => write!(f, "The move was rejected"),
            ServerError::MatchAlreadyExists { name } => {
                write!(f, "A match named {} already exists", name)
            }
            ServerError::UnknownMatch { name } => write!(f, "There's no match named {}", name),
            ServerError::RemoteCallFailed { reason } => {
                write!(f, "Remote call failed: {}", reason)
            }
        }
    }
}
