use serde::{Deserialize, Serialize};

use crate::{Board, PlayerMark, Ticket};

/// Request sent to a match server over the line protocol.
///
/// Each request is one line of JSON. The response is one line holding a
/// `Result<T, ServerError>`, where `T` depends on the request and is documented
/// on each variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Host a new match under this name.
    ///
    /// The response is an [`Okay`].
    CreateMatch { name: String },
    /// The response is a list of match names, sorted.
    ListMatches,
    /// Forward a call to the match with this name.
    Match { name: String, call: MatchCall },
    /// The client is done. There is no response.
    Bye,
}

/// A call on a single match. See [`GameServer`](crate::GameServer) for the semantics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "call")]
pub enum MatchCall {
    /// The response is a [`Ticket`].
    AcquireTicket,
    /// The response is an [`Okay`].
    ReleaseTicket { ticket: Ticket },
    /// The response is a [`PlayerDescriptor`](crate::PlayerDescriptor).
    RegisterPlayer { player_name: String, ticket: Ticket },
    /// The response is an [`Okay`].
    NewMatch { ticket: Ticket },
    /// The response is an [`Okay`].
    EndMatch { ticket: Ticket },
    /// The response is a `bool`.
    IsRunning,
    /// The response is a list of [`PlayerRecord`](crate::PlayerRecord)s.
    ListPlayers,
    /// The response is an optional [`Board`].
    GetStateImmediate,
    /// The response is an optional [`Board`], sent once it's `mark`'s turn or the match ended.
    GetStateBlocking { mark: PlayerMark, ticket: Ticket },
    /// The response is an [`Okay`].
    SubmitMove {
        column: usize,
        mark: PlayerMark,
        expected: Board,
        ticket: Ticket,
    },
}

impl MatchCall {
    /// Name of the call, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            MatchCall::AcquireTicket => "acquire_ticket",
            MatchCall::ReleaseTicket { .. } => "release_ticket",
            MatchCall::RegisterPlayer { .. } => "register_player",
            MatchCall::NewMatch { .. } => "new_match",
            MatchCall::EndMatch { .. } => "end_match",
            MatchCall::IsRunning => "is_running",
            MatchCall::ListPlayers => "list_players",
            MatchCall::GetStateImmediate => "get_state_immediate",
            MatchCall::GetStateBlocking { .. } => "get_state_blocking",
            MatchCall::SubmitMove { .. } => "submit_move",
        }
    }
}

/// Dummy struct for use in server communication.
///
/// Used to signal an acknowledgement without data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Okay();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_call_is_tagged() {
        let req = Request::Match {
            name: String::from("local"),
            call: MatchCall::IsRunning,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Match","name":"local","call":{"call":"IsRunning"}}"#
        );
    }

    #[test]
    fn submit_move_carries_the_expected_board() {
        let mut board = Board::new();
        board.play(3, PlayerMark::Red).unwrap();
        let req = Request::Match {
            name: String::from("m"),
            call: MatchCall::SubmitMove {
                column: 2,
                mark: PlayerMark::Yellow,
                expected: board.clone(),
                ticket: Ticket::generate(),
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        match serde_json::from_str::<Request>(&json).unwrap() {
            Request::Match {
                call: MatchCall::SubmitMove { expected, .. },
                ..
            } => assert_eq!(expected, board),
            other => panic!("unexpected request {:?}", other),
        }
    }
}
