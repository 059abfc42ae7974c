use std::sync::Arc;

use crate::{Board, PlayerDescriptor, PlayerMark, PlayerRecord, ServerError, Ticket};

/// The calls a client can make on one match.
///
/// Implemented by the server's match coordinator for in-process players, and by a
/// network proxy for remote ones. Every call may fail with
/// [`ServerError::RemoteCallFailed`] when it crosses a process boundary.
pub trait GameServer {
    fn acquire_ticket(&self) -> Result<Ticket, ServerError>;

    /// Returns the ticket to the pool and unregisters the player holding it, if any.
    fn release_ticket(&self, ticket: Ticket) -> Result<(), ServerError>;

    fn register_player(&self, name: &str, ticket: Ticket)
        -> Result<PlayerDescriptor, ServerError>;

    fn new_match(&self, ticket: Ticket) -> Result<(), ServerError>;

    fn end_match(&self, ticket: Ticket) -> Result<(), ServerError>;

    fn is_running(&self) -> Result<bool, ServerError>;

    /// The registered players in registration order.
    fn list_players(&self) -> Result<Vec<PlayerRecord>, ServerError>;

    /// A copy of the current board, or `None` if no match has been started. Never blocks.
    fn state_immediate(&self) -> Result<Option<Board>, ServerError>;

    /// Like [`GameServer::state_immediate()`], but while a match is running this blocks
    /// until it is `mark`'s turn or the match ends.
    fn state_blocking(&self, mark: PlayerMark, ticket: Ticket)
        -> Result<Option<Board>, ServerError>;

    /// Plays `column` for `mark`. A move made against a board that no longer matches
    /// the server's (`expected`) is silently ignored.
    fn submit_move(
        &self,
        column: usize,
        mark: PlayerMark,
        expected: &Board,
        ticket: Ticket,
    ) -> Result<(), ServerError>;
}

macro_rules! forward_game_server {
    ($ty:ty) => {
        impl<T: GameServer + ?Sized> GameServer for $ty {
            fn acquire_ticket(&self) -> Result<Ticket, ServerError> {
                (**self).acquire_ticket()
            }

            fn release_ticket(&self, ticket: Ticket) -> Result<(), ServerError> {
                (**self).release_ticket(ticket)
            }

            fn register_player(
                &self,
                name: &str,
                ticket: Ticket,
            ) -> Result<PlayerDescriptor, ServerError> {
                (**self).register_player(name, ticket)
            }

            fn new_match(&self, ticket: Ticket) -> Result<(), ServerError> {
                (**self).new_match(ticket)
            }

            fn end_match(&self, ticket: Ticket) -> Result<(), ServerError> {
                (**self).end_match(ticket)
            }

            fn is_running(&self) -> Result<bool, ServerError> {
                (**self).is_running()
            }

            fn list_players(&self) -> Result<Vec<PlayerRecord>, ServerError> {
                (**self).list_players()
            }

            fn state_immediate(&self) -> Result<Option<Board>, ServerError> {
                (**self).state_immediate()
            }

            fn state_blocking(
                &self,
                mark: PlayerMark,
                ticket: Ticket,
            ) -> Result<Option<Board>, ServerError> {
                (**self).state_blocking(mark, ticket)
            }

            fn submit_move(
                &self,
                column: usize,
                mark: PlayerMark,
                expected: &Board,
                ticket: Ticket,
            ) -> Result<(), ServerError> {
                (**self).submit_move(column, mark, expected, ticket)
            }
        }
    };
}

forward_game_server!(Arc<T>);
forward_game_server!(&T);
