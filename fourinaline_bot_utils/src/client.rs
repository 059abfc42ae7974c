use std::thread;
use std::time::Duration;

use fourinaline::{
    Board, ErrorKind, GameServer, PlayerDescriptor, PlayerMark, PlayerRecord, ServerError, Ticket,
};
use tracing::{debug, info, warn};

use crate::Bot;

/// How long a client waits before polling again when it is not its turn.
pub const SERVER_STATUS_UPDATE_PERIOD: Duration = Duration::from_millis(100);

/// How many decorated names ("name (2)", "name (3)", ...) are tried after the plain one.
pub const MAX_NAME_ATTEMPTS: usize = 10;

/// A player seated in one match.
///
/// Holds a ticket from the moment it connects until it disconnects or is dropped.
pub struct Client<S: GameServer> {
    server: S,
    ticket: Ticket,
    descriptor: PlayerDescriptor,
    connected: bool,
    auto_start: bool,
    /// Set after a rejected move, so that the turn permit already taken isn't waited for again.
    holds_turn: bool,
    /// Moves on the last board seen, to notice when a new match replaces it.
    last_history_len: Option<usize>,
}

impl<S: GameServer> Client<S> {
    /// Takes a ticket and registers under `name`, or a decorated variant of it if the
    /// name is taken.
    pub fn connect(server: S, name: &str) -> Result<Self, ServerError> {
        let ticket = server.acquire_ticket()?;
        match register_with_free_name(&server, name, ticket) {
            Ok(descriptor) => {
                info!(
                    player = descriptor.player.name(),
                    mark = %descriptor.player.mark(),
                    is_owner = descriptor.is_owner,
                    "Connected"
                );
                Ok(Self {
                    server,
                    ticket,
                    descriptor,
                    connected: true,
                    auto_start: false,
                    holds_turn: false,
                    last_history_len: None,
                })
            }
            Err(err) => {
                if let Err(release_err) = server.release_ticket(ticket) {
                    debug!(%release_err, "Could not give back the ticket");
                }
                Err(err)
            }
        }
    }

    /// When set and this client owns the match, it starts a new match whenever none is
    /// running.
    pub fn auto_start(mut self, enabled: bool) -> Self {
        self.auto_start = enabled;
        self
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn player(&self) -> &PlayerRecord {
        &self.descriptor.player
    }

    pub fn is_owner(&self) -> bool {
        self.descriptor.is_owner
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Plays with `bot` until the match is torn down or the connection fails.
    ///
    /// A torn down match ends the loop normally. A transport failure disconnects and is
    /// returned. Rejected calls are logged and the loop goes on.
    pub fn run<B: Bot>(&mut self, bot: &mut B) -> Result<(), ServerError> {
        let mark = self.descriptor.player.mark();
        while self.connected {
            match self.step(bot, mark) {
                Ok(()) => {}
                // A torn down match invalidates the ticket, and the server forgets its name.
                Err(ServerError::InvalidTicket | ServerError::UnknownMatch { .. }) => {
                    info!(player = self.player().name(), "The match is gone");
                    self.connected = false;
                }
                Err(err) if err.kind() == ErrorKind::Transport => {
                    warn!(player = self.player().name(), %err, "Lost the server");
                    self.disconnect();
                    return Err(err);
                }
                Err(err) => {
                    warn!(player = self.player().name(), %err, "Call rejected");
                    thread::sleep(SERVER_STATUS_UPDATE_PERIOD);
                }
            }
        }
        Ok(())
    }

    fn step<B: Bot>(&mut self, bot: &mut B, mark: PlayerMark) -> Result<(), ServerError> {
        let state = if self.holds_turn {
            self.server.state_immediate()?
        } else {
            self.server.state_blocking(mark, self.ticket)?
        };
        self.holds_turn = false;

        let Some(board) = state.filter(|board| !board.is_over()) else {
            self.last_history_len = None;
            if self.auto_start && self.is_owner() {
                self.start_match_if_idle()?;
            }
            thread::sleep(SERVER_STATUS_UPDATE_PERIOD);
            return Ok(());
        };

        let moves = board.history().len();
        if self.last_history_len.map_or(true, |last| moves < last) {
            bot.new_match(mark);
        }
        self.last_history_len = Some(moves);

        if board.current_player() != mark {
            thread::sleep(SERVER_STATUS_UPDATE_PERIOD);
            return Ok(());
        }
        self.play_turn(bot, mark, &board)
    }

    fn play_turn<B: Bot>(
        &mut self,
        bot: &mut B,
        mark: PlayerMark,
        board: &Board,
    ) -> Result<(), ServerError> {
        let Some(column) = bot.choose_column(board, mark) else {
            warn!(player = self.player().name(), "The bot found no move");
            self.holds_turn = true;
            thread::sleep(SERVER_STATUS_UPDATE_PERIOD);
            return Ok(());
        };
        debug!(player = self.player().name(), column, "Playing");
        let result = self.server.submit_move(column, mark, board, self.ticket);
        if matches!(&result, Err(err) if err.kind() == ErrorKind::Rules) {
            self.holds_turn = true;
        }
        result
    }

    fn start_match_if_idle(&self) -> Result<(), ServerError> {
        if self.server.is_running()? || self.server.list_players()?.len() < PlayerMark::COUNT {
            return Ok(());
        }
        match self.server.new_match(self.ticket) {
            Ok(()) => {
                info!(player = self.player().name(), "Started a new match");
                Ok(())
            }
            // Someone left or the match got started in between.
            Err(ServerError::AlreadyRunning | ServerError::NotAllPlayersRegistered) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Gives the ticket back, which also ends a running match. Idempotent.
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        match self.server.release_ticket(self.ticket) {
            Ok(()) => info!(player = self.player().name(), "Disconnected"),
            Err(err) => debug!(player = self.player().name(), %err, "Could not give back the ticket"),
        }
    }
}

impl<S: GameServer> Drop for Client<S> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn register_with_free_name<S: GameServer>(
    server: &S,
    name: &str,
    ticket: Ticket,
) -> Result<PlayerDescriptor, ServerError> {
    match server.register_player(name, ticket) {
        Err(ServerError::DuplicateName { .. }) => {}
        other => return other,
    }
    for attempt in 2..MAX_NAME_ATTEMPTS + 2 {
        let candidate = format!("{} ({})", name, attempt);
        match server.register_player(&candidate, ticket) {
            Err(ServerError::DuplicateName { .. }) => debug!(name = %candidate, "Name taken"),
            other => return other,
        }
    }
    Err(ServerError::DuplicateName {
        name: name.to_string(),
    })
}
