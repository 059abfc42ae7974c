use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use fourinaline::{
    Board, GameServer, GameStatus, PlayerDescriptor, PlayerMark, PlayerRecord, ServerError, Ticket,
};
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::watchdog::{spawn_watchdog, Liveness};
use crate::TurnGate;

pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Permits released on both gates when a match ends, so that every parked caller wakes up.
pub const MATCH_END_PERMITS: usize = 150;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// The match is torn down after this long without a ticket being used.
    pub inactivity_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
        }
    }
}

/// Sent when a coordinator has been torn down and should be forgotten.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Teardown {
    pub match_name: String,
}

/// Referee for one match between two players.
///
/// Owns the authoritative board and the ticket pool. Every call goes through a single
/// lock, except the wait in [`GameServer::state_blocking()`], which happens on the turn
/// gate of the caller's mark with the lock released.
#[derive(Debug)]
pub struct MatchCoordinator {
    name: String,
    state: Mutex<MatchState>,
    liveness: Arc<Liveness>,
    teardown_tx: Option<Sender<Teardown>>,
}

#[derive(Debug)]
struct Seat {
    name: String,
    mark: PlayerMark,
    score: u32,
}

#[derive(Debug)]
struct MatchState {
    board: Option<Board>,
    /// In registration order.
    seats: Vec<Seat>,
    owner: Option<String>,
    unused_tickets: Vec<Ticket>,
    /// Checked-out tickets and the name of the player registered with each.
    used_tickets: HashMap<Ticket, Option<String>>,
    /// Replaced on every new match, so that waiters of an old match can't eat new permits.
    gates: [Arc<TurnGate>; PlayerMark::COUNT],
    score_updated: bool,
    torn_down: bool,
}

impl MatchState {
    fn new() -> Self {
        Self {
            board: None,
            seats: Vec::with_capacity(PlayerMark::COUNT),
            owner: None,
            unused_tickets: (0..PlayerMark::COUNT).map(|_| Ticket::generate()).collect(),
            used_tickets: HashMap::new(),
            gates: fresh_gates(),
            score_updated: false,
            torn_down: false,
        }
    }

    fn check_ticket(&self, ticket: Ticket) -> Result<(), ServerError> {
        if self.used_tickets.contains_key(&ticket) {
            Ok(())
        } else {
            Err(ServerError::InvalidTicket)
        }
    }

    fn check_owner(&self, ticket: Ticket) -> Result<(), ServerError> {
        let holder = self.used_tickets.get(&ticket).and_then(Option::as_deref);
        match (holder, self.owner.as_deref()) {
            (Some(holder), Some(owner)) if holder == owner => Ok(()),
            _ => Err(ServerError::NotMatchOwner),
        }
    }

    fn is_running(&self) -> bool {
        self.board
            .as_ref()
            .is_some_and(|board| *board.status() == GameStatus::Continue)
    }

    fn free_mark(&self) -> Option<PlayerMark> {
        PlayerMark::ALL
            .into_iter()
            .find(|mark| self.seats.iter().all(|seat| seat.mark != *mark))
    }

    fn release_all_gates(&self) {
        for gate in &self.gates {
            gate.release(MATCH_END_PERMITS);
        }
    }

    /// Forgets the current board and wakes everyone waiting on it.
    fn end_match(&mut self) {
        self.board = None;
        self.release_all_gates();
    }

    fn records(&self) -> Vec<PlayerRecord> {
        self.seats
            .iter()
            .map(|seat| PlayerRecord::new(seat.name.clone(), seat.mark, seat.score))
            .collect()
    }
}

fn fresh_gates() -> [Arc<TurnGate>; PlayerMark::COUNT] {
    std::array::from_fn(|_| Arc::new(TurnGate::closed()))
}

impl MatchCoordinator {
    /// Creates the coordinator and starts its inactivity watchdog.
    ///
    /// `teardown_tx` is notified once the match is torn down, for whatever reason.
    pub fn new(
        name: impl Into<String>,
        config: CoordinatorConfig,
        teardown_tx: Option<Sender<Teardown>>,
    ) -> Arc<Self> {
        let liveness = Arc::new(Liveness::new(config.inactivity_timeout));
        let coordinator = Arc::new(Self {
            name: name.into(),
            state: Mutex::new(MatchState::new()),
            liveness: Arc::clone(&liveness),
            teardown_tx,
        });
        spawn_watchdog(Arc::downgrade(&coordinator), liveness);
        coordinator
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }

    /// Tears the match down as if it had been abandoned.
    pub fn shutdown(&self) {
        self.teardown("shutdown");
    }

    /// Invalidates every ticket, drops the players and ends the match. Idempotent.
    pub(crate) fn teardown(&self, reason: &'static str) {
        {
            let mut state = self.state.lock();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.end_match();
            state.seats.clear();
            state.owner = None;
            state.used_tickets.clear();
            state.unused_tickets.clear();
        }
        self.liveness.stop();
        info!(match_name = %self.name, reason, "Match torn down");
        if let Some(tx) = &self.teardown_tx {
            // The registry may be gone already, which is fine.
            let _ = tx.send(Teardown {
                match_name: self.name.clone(),
            });
        }
    }
}

impl Drop for MatchCoordinator {
    fn drop(&mut self) {
        self.liveness.stop();
    }
}

impl GameServer for MatchCoordinator {
    fn acquire_ticket(&self) -> Result<Ticket, ServerError> {
        let mut state = self.state.lock();
        let ticket = state
            .unused_tickets
            .pop()
            .ok_or(ServerError::NoTicketAvailable)?;
        state.used_tickets.insert(ticket, None);
        self.liveness.touch();
        debug!(match_name = %self.name, ?ticket, "Ticket handed out");
        Ok(ticket)
    }

    fn release_ticket(&self, ticket: Ticket) -> Result<(), ServerError> {
        let tear_down = {
            let mut state = self.state.lock();
            let holder = state
                .used_tickets
                .remove(&ticket)
                .ok_or(ServerError::UnknownTicket)?;
            self.liveness.touch();
            state.unused_tickets.push(ticket);
            let owner_left = holder.is_some() && holder == state.owner;
            if let Some(name) = holder {
                if state.is_running() {
                    info!(match_name = %self.name, player = %name, "Player left mid-match");
                    state.end_match();
                }
                state.seats.retain(|seat| seat.name != name);
                info!(match_name = %self.name, player = %name, "Player unregistered");
            }
            owner_left || state.used_tickets.is_empty()
        };
        if tear_down {
            self.teardown("abandoned");
        }
        Ok(())
    }

    fn register_player(
        &self,
        name: &str,
        ticket: Ticket,
    ) -> Result<PlayerDescriptor, ServerError> {
        let mut state = self.state.lock();
        state.check_ticket(ticket)?;
        self.liveness.touch();
        if state.is_running() {
            return Err(ServerError::AlreadyRunning);
        }
        if state.used_tickets.get(&ticket).is_some_and(Option::is_some) {
            return Err(ServerError::AlreadyRegisteredTicket);
        }
        if state.seats.iter().any(|seat| seat.name == name) {
            return Err(ServerError::DuplicateName {
                name: name.to_string(),
            });
        }
        let mark = state.free_mark().ok_or(ServerError::TooManyPlayers)?;
        state.seats.push(Seat {
            name: name.to_string(),
            mark,
            score: 0,
        });
        state.used_tickets.insert(ticket, Some(name.to_string()));
        let is_owner = state.owner.is_none();
        if is_owner {
            state.owner = Some(name.to_string());
        }
        info!(match_name = %self.name, player = %name, %mark, is_owner, "Player registered");
        Ok(PlayerDescriptor {
            player: PlayerRecord::new(name, mark, 0),
            is_owner,
        })
    }

    fn new_match(&self, ticket: Ticket) -> Result<(), ServerError> {
        let mut state = self.state.lock();
        state.check_ticket(ticket)?;
        self.liveness.touch();
        state.check_owner(ticket)?;
        if state.seats.len() < PlayerMark::COUNT {
            return Err(ServerError::NotAllPlayersRegistered);
        }
        if state.is_running() {
            return Err(ServerError::AlreadyRunning);
        }
        let board = Board::new();
        state.gates = fresh_gates();
        state.gates[board.current_player().index()].release(1);
        state.board = Some(board);
        state.score_updated = false;
        info!(match_name = %self.name, "New match started");
        Ok(())
    }

    fn end_match(&self, ticket: Ticket) -> Result<(), ServerError> {
        let mut state = self.state.lock();
        state.check_ticket(ticket)?;
        self.liveness.touch();
        state.check_owner(ticket)?;
        state.end_match();
        info!(match_name = %self.name, "Match ended by its owner");
        Ok(())
    }

    fn is_running(&self) -> Result<bool, ServerError> {
        Ok(self.state.lock().is_running())
    }

    fn list_players(&self) -> Result<Vec<PlayerRecord>, ServerError> {
        Ok(self.state.lock().records())
    }

    fn state_immediate(&self) -> Result<Option<Board>, ServerError> {
        Ok(self.state.lock().board.clone())
    }

    fn state_blocking(
        &self,
        mark: PlayerMark,
        ticket: Ticket,
    ) -> Result<Option<Board>, ServerError> {
        let gate = {
            let state = self.state.lock();
            state.check_ticket(ticket)?;
            self.liveness.touch();
            if !state.is_running() {
                return Ok(state.board.clone());
            }
            Arc::clone(&state.gates[mark.index()])
        };
        if !gate.try_acquire() {
            trace!(match_name = %self.name, %mark, "Waiting for the turn");
            gate.acquire();
        }
        Ok(self.state.lock().board.clone())
    }

    fn submit_move(
        &self,
        column: usize,
        mark: PlayerMark,
        expected: &Board,
        ticket: Ticket,
    ) -> Result<(), ServerError> {
        let mut guard = self.state.lock();
        guard.check_ticket(ticket)?;
        self.liveness.touch();
        let state = &mut *guard;
        let Some(board) = state.board.as_mut() else {
            debug!(match_name = %self.name, %mark, "Move submitted without a match");
            return Ok(());
        };
        if board != expected {
            debug!(match_name = %self.name, %mark, column, "Stale move ignored");
            return Ok(());
        }
        board.play(column, mark)?;
        debug!(match_name = %self.name, %mark, column, "Move played");
        match board.status() {
            GameStatus::Continue => state.gates[board.current_player().index()].release(1),
            status => {
                if !state.score_updated {
                    state.score_updated = true;
                    if let GameStatus::Won { mark: winner, .. } = status {
                        if let Some(seat) = state.seats.iter_mut().find(|s| s.mark == *winner) {
                            seat.score += 1;
                        }
                    }
                }
                info!(match_name = %self.name, ?status, "Match over");
                state.release_all_gates();
            }
        }
        Ok(())
    }
}
