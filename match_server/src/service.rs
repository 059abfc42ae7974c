use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use fourinaline::{GameServer, MatchCall, Okay, Request, ServerError, Ticket};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::{MatchCoordinator, SessionRegistry};

/// Accepts connections forever, serving each one on its own thread.
pub fn serve(listener: TcpListener, registry: Arc<SessionRegistry>) -> anyhow::Result<()> {
    info!(address = %listener.local_addr()?, "Listening");
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                warn!(%err, "Could not accept a connection");
                continue;
            }
        };
        let registry = Arc::clone(&registry);
        thread::Builder::new()
            .name(String::from("connection"))
            .spawn(move || {
                let peer = stream.peer_addr().ok();
                debug!(?peer, "Connection opened");
                if let Err(err) = handle_connection(stream, &registry) {
                    debug!(?peer, %err, "Connection failed");
                }
                debug!(?peer, "Connection closed");
            })?;
    }
    Ok(())
}

/// Tickets checked out through one connection, with the match they belong to.
#[derive(Debug, Default)]
struct HeldTickets(Vec<(String, Ticket)>);

impl HeldTickets {
    fn insert(&mut self, match_name: &str, ticket: Ticket) {
        self.0.push((match_name.to_string(), ticket));
    }

    fn remove(&mut self, ticket: Ticket) {
        self.0.retain(|(_, held)| *held != ticket);
    }

    /// Gives back whatever the peer still holds, as if it had disconnected cleanly.
    fn release_all(self, registry: &SessionRegistry) {
        for (match_name, ticket) in self.0 {
            let Ok(coordinator) = registry.get(&match_name) else {
                continue;
            };
            // The match may have been torn down already, which invalidated the ticket.
            if coordinator.release_ticket(ticket).is_ok() {
                info!(%match_name, "Released the ticket of a departed client");
            }
        }
    }
}

/// Serves requests until the peer says bye or hangs up, then releases the tickets it
/// still holds.
pub fn handle_connection(stream: TcpStream, registry: &SessionRegistry) -> anyhow::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let mut held = HeldTickets::default();
    let result = serve_requests(&mut reader, &mut writer, registry, &mut held);
    held.release_all(registry);
    result
}

fn serve_requests(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    registry: &SessionRegistry,
    held: &mut HeldTickets,
) -> anyhow::Result<()> {
    let mut buf = String::new();
    loop {
        buf.clear();
        let num_bytes_read = reader.read_line(&mut buf)?;
        if num_bytes_read == 0 {
            break Ok(());
        }
        trace!(name: "Received request", request = %buf.trim_end());
        let req = match serde_json::from_str::<Request>(buf.trim_end()) {
            Ok(req) => req,
            Err(err) => {
                warn!(%err, "Malformed request");
                let response = to_json::<Okay>(Err(ServerError::remote(format!(
                    "Malformed request: {}",
                    err
                ))))?;
                writeln!(writer, "{}", response)?;
                writer.flush()?;
                continue;
            }
        };

        let response = match req {
            Request::CreateMatch { name } => {
                to_json(registry.create_match(&name).map(|_| Okay()))?
            }
            Request::ListMatches => to_json(Ok(registry.match_names()))?,
            Request::Match { name, call } => match registry.get(&name) {
                Ok(coordinator) => dispatch(&coordinator, call, held)?,
                Err(err) => to_json::<Okay>(Err(err))?,
            },
            Request::Bye => break Ok(()),
        };
        trace!(name: "Sending response", response = %response);
        writer.write_all(response.as_bytes())?;
        writeln!(writer)?;
        writer.flush()?;
    }
}

fn dispatch(
    coordinator: &MatchCoordinator,
    call: MatchCall,
    held: &mut HeldTickets,
) -> serde_json::Result<String> {
    debug!(match_name = %coordinator.name(), call = call.name(), "Serving call");
    match call {
        MatchCall::AcquireTicket => {
            let result = coordinator.acquire_ticket();
            if let Ok(ticket) = result {
                held.insert(coordinator.name(), ticket);
            }
            to_json(result)
        }
        MatchCall::ReleaseTicket { ticket } => {
            let result = coordinator.release_ticket(ticket);
            if result.is_ok() {
                held.remove(ticket);
            }
            to_json(result.map(|()| Okay()))
        }
        MatchCall::RegisterPlayer {
            player_name,
            ticket,
        } => to_json(coordinator.register_player(&player_name, ticket)),
        MatchCall::NewMatch { ticket } => to_json(coordinator.new_match(ticket).map(|()| Okay())),
        MatchCall::EndMatch { ticket } => to_json(coordinator.end_match(ticket).map(|()| Okay())),
        MatchCall::IsRunning => to_json(coordinator.is_running()),
        MatchCall::ListPlayers => to_json(coordinator.list_players()),
        MatchCall::GetStateImmediate => to_json(coordinator.state_immediate()),
        MatchCall::GetStateBlocking { mark, ticket } => {
            to_json(coordinator.state_blocking(mark, ticket))
        }
        MatchCall::SubmitMove {
            column,
            mark,
            expected,
            ticket,
        } => to_json(
            coordinator
                .submit_move(column, mark, &expected, ticket)
                .map(|()| Okay()),
        ),
    }
}

fn to_json<T: Serialize>(result: Result<T, ServerError>) -> serde_json::Result<String> {
    serde_json::to_string(&result)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::net::SocketAddr;

    use fourinaline::{Board, PlayerDescriptor, PlayerMark};
    use fourinaline_bot_utils::{Bot, Client, RemoteServer};

    use super::*;
    use crate::CoordinatorConfig;

    fn exchange(
        registry: &SessionRegistry,
        held: &mut HeldTickets,
        requests: &[Request],
    ) -> Vec<String> {
        let mut input = String::new();
        for req in requests {
            input.push_str(&serde_json::to_string(req).unwrap());
            input.push('\n');
        }
        let mut output = Vec::new();
        serve_requests(&mut Cursor::new(input), &mut output, registry, held).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    fn on_match(call: MatchCall) -> Request {
        Request::Match {
            name: String::from("lobby"),
            call,
        }
    }

    #[test]
    fn requests_are_answered_line_by_line() {
        let registry = SessionRegistry::new(CoordinatorConfig::default());
        let mut held = HeldTickets::default();
        let lines = exchange(
            &registry,
            &mut held,
            &[
                Request::CreateMatch {
                    name: String::from("lobby"),
                },
                Request::ListMatches,
                on_match(MatchCall::IsRunning),
                Request::Match {
                    name: String::from("nowhere"),
                    call: MatchCall::IsRunning,
                },
                Request::Bye,
                Request::ListMatches,
            ],
        );
        assert_eq!(lines.len(), 4);
        let created: Result<Okay, ServerError> = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(created, Ok(Okay()));
        assert_eq!(lines[1], r#"{"Ok":["lobby"]}"#);
        assert_eq!(lines[2], r#"{"Ok":false}"#);
        let err: Result<bool, ServerError> = serde_json::from_str(&lines[3]).unwrap();
        assert_eq!(
            err,
            Err(ServerError::UnknownMatch {
                name: String::from("nowhere")
            })
        );
    }

    #[test]
    fn malformed_requests_are_answered_and_skipped() {
        let registry = SessionRegistry::new(CoordinatorConfig::default());
        let input = format!(
            "{{\"type\":\"Dance\"}}\n{}\n",
            serde_json::to_string(&Request::ListMatches).unwrap()
        );
        let mut output = Vec::new();
        serve_requests(
            &mut Cursor::new(input),
            &mut output,
            &registry,
            &mut HeldTickets::default(),
        )
        .unwrap();
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let err: Result<Okay, ServerError> = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(err, Err(ServerError::RemoteCallFailed { .. })));
        assert_eq!(lines[1], r#"{"Ok":[]}"#);
    }

    #[test]
    fn tickets_left_behind_are_released() {
        let registry = SessionRegistry::new(CoordinatorConfig::default());
        let coordinator = registry.create_match("lobby").unwrap();
        let mut held = HeldTickets::default();
        let lines = exchange(&registry, &mut held, &[on_match(MatchCall::AcquireTicket)]);
        let ticket: Result<Ticket, ServerError> = serde_json::from_str(&lines[0]).unwrap();
        let ticket = ticket.unwrap();
        let lines = exchange(
            &registry,
            &mut held,
            &[on_match(MatchCall::RegisterPlayer {
                player_name: String::from("alice"),
                ticket,
            })],
        );
        let descriptor: Result<PlayerDescriptor, ServerError> =
            serde_json::from_str(&lines[0]).unwrap();
        assert!(descriptor.unwrap().is_owner);

        held.release_all(&registry);
        // The owner left, so the whole match went away.
        assert!(coordinator.is_torn_down());
        assert!(registry.match_names().is_empty());
    }

    #[test]
    fn released_tickets_are_not_held_anymore() {
        let registry = SessionRegistry::new(CoordinatorConfig::default());
        registry.create_match("lobby").unwrap();
        let mut held = HeldTickets::default();
        let lines = exchange(&registry, &mut held, &[on_match(MatchCall::AcquireTicket)]);
        let ticket: Result<Ticket, ServerError> = serde_json::from_str(&lines[0]).unwrap();
        exchange(
            &registry,
            &mut held,
            &[on_match(MatchCall::ReleaseTicket {
                ticket: ticket.unwrap(),
            })],
        );
        assert!(held.0.is_empty());
    }

    #[test]
    fn moves_travel_over_tcp() {
        let registry = Arc::new(SessionRegistry::new(CoordinatorConfig::default()));
        let coordinator = registry.create_match("lobby").unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        {
            let registry = Arc::clone(&registry);
            thread::spawn(move || serve(listener, registry));
        }

        let red = coordinator.acquire_ticket().unwrap();
        coordinator.register_player("alice", red).unwrap();

        let stream = TcpStream::connect(addr).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut writer = stream;
        let mut call = move |call: MatchCall| -> String {
            let mut line = serde_json::to_string(&on_match(call)).unwrap();
            line.push('\n');
            writer.write_all(line.as_bytes()).unwrap();
            let mut response = String::new();
            reader.read_line(&mut response).unwrap();
            response
        };

        let ticket: Result<Ticket, ServerError> =
            serde_json::from_str(&call(MatchCall::AcquireTicket)).unwrap();
        let yellow = ticket.unwrap();
        call(MatchCall::RegisterPlayer {
            player_name: String::from("bob"),
            ticket: yellow,
        });
        coordinator.new_match(red).unwrap();
        let board = coordinator.state_immediate().unwrap().unwrap();
        coordinator
            .submit_move(3, PlayerMark::Red, &board, red)
            .unwrap();

        let state: Result<Option<Board>, ServerError> = serde_json::from_str(&call(
            MatchCall::GetStateBlocking {
                mark: PlayerMark::Yellow,
                ticket: yellow,
            },
        ))
        .unwrap();
        let board = state.unwrap().unwrap();
        assert_eq!(board.current_player(), PlayerMark::Yellow);
        let done: Result<Okay, ServerError> = serde_json::from_str(&call(MatchCall::SubmitMove {
            column: 4,
            mark: PlayerMark::Yellow,
            expected: board,
            ticket: yellow,
        }))
        .unwrap();
        assert_eq!(done, Ok(Okay()));
        let board = coordinator.state_immediate().unwrap().unwrap();
        assert_eq!(board.history(), &[3, 4]);

        // Hanging up gives the ticket back and ends the match.
        drop(call);
        let start = std::time::Instant::now();
        while coordinator.list_players().unwrap().len() > 1 {
            assert!(start.elapsed() < std::time::Duration::from_secs(5));
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(!coordinator.is_running().unwrap());
    }

    struct LeftmostBot;

    impl Bot for LeftmostBot {
        fn choose_column(&mut self, board: &Board, _mark: PlayerMark) -> Option<usize> {
            board.playable_columns().first().copied()
        }
    }

    #[test]
    fn remote_clients_play_a_full_match() {
        let registry = Arc::new(SessionRegistry::new(CoordinatorConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        {
            let registry = Arc::clone(&registry);
            thread::spawn(move || serve(listener, registry));
        }

        let host = RemoteServer::connect(addr, "lobby").unwrap();
        host.create_match().unwrap();
        assert_eq!(host.list_matches().unwrap(), ["lobby"]);
        let owner = Client::connect(host, "leftmost").unwrap();
        let guest = Client::connect(RemoteServer::connect(addr, "lobby").unwrap(), "leftmost")
            .unwrap();
        assert!(owner.is_owner());
        assert_eq!(guest.player().name(), "leftmost (2)");
        owner.server().new_match(owner.ticket()).unwrap();

        let players: Vec<_> = [owner, guest]
            .into_iter()
            .map(|mut client| thread::spawn(move || client.run(&mut LeftmostBot)))
            .collect();

        let coordinator = registry.get("lobby").unwrap();
        let start = std::time::Instant::now();
        while coordinator.is_running().unwrap() {
            assert!(start.elapsed() < std::time::Duration::from_secs(10));
            thread::sleep(std::time::Duration::from_millis(10));
        }
        let board = coordinator.state_immediate().unwrap().unwrap();
        assert_eq!(board.winner(), Some(PlayerMark::Red));

        coordinator.shutdown();
        for player in players {
            assert_eq!(player.join().unwrap(), Ok(()));
        }
        assert!(registry.match_names().is_empty());
    }
}
