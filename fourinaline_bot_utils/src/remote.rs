use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};

use anyhow::bail;
use fourinaline::{
    Board, GameServer, MatchCall, Okay, PlayerDescriptor, PlayerMark, PlayerRecord, Request,
    ServerError, Ticket,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::trace;

/// A match hosted by a server on the other end of a TCP connection.
///
/// Calls are serialized over the single connection. Once a call fails in transit the
/// connection is dropped, and every later call fails right away.
pub struct RemoteServer {
    match_name: String,
    connection: Mutex<Option<Connection>>,
}

struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    // A re-usable buffer for IO.
    // Should always be empty before and after round_trip().
    buf: String,
}

impl Connection {
    fn round_trip<T: DeserializeOwned>(
        &mut self,
        req: &Request,
    ) -> anyhow::Result<Result<T, ServerError>> {
        let mut req_json = serde_json::to_string(req)?;
        trace!(name: "Sending request", request = %req_json);
        req_json.push('\n');
        self.writer.write_all(req_json.as_bytes())?;
        self.writer.flush()?;
        self.buf.clear();
        let num_bytes_read = self.reader.read_line(&mut self.buf)?;
        if num_bytes_read == 0 {
            bail!("The server closed the connection");
        }
        let serialized_response = self.buf.trim_end();
        trace!(name: "Received response", response = %serialized_response);
        let response = serde_json::from_str(serialized_response)?;
        self.buf.clear();
        Ok(response)
    }
}

impl RemoteServer {
    /// Connects to the server at `addr`, to make calls on the match named `match_name`.
    pub fn connect(addr: impl ToSocketAddrs, match_name: &str) -> anyhow::Result<Self> {
        let writer = TcpStream::connect(addr)?;
        writer.set_nodelay(true)?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(Self {
            match_name: String::from(match_name),
            connection: Mutex::new(Some(Connection {
                reader,
                writer,
                buf: String::new(),
            })),
        })
    }

    pub fn match_name(&self) -> &str {
        &self.match_name
    }

    /// Hosts a new match on the server, under this proxy's match name.
    pub fn create_match(&self) -> Result<(), ServerError> {
        self.perform_request::<Okay>(&Request::CreateMatch {
            name: self.match_name.clone(),
        })
        .map(|_| ())
    }

    /// Names of every match hosted on the server.
    pub fn list_matches(&self) -> Result<Vec<String>, ServerError> {
        self.perform_request(&Request::ListMatches)
    }

    fn call<T: DeserializeOwned>(&self, call: MatchCall) -> Result<T, ServerError> {
        self.perform_request(&Request::Match {
            name: self.match_name.clone(),
            call,
        })
    }

    fn perform_request<T: DeserializeOwned>(&self, req: &Request) -> Result<T, ServerError> {
        let mut connection = self.connection.lock();
        let Some(conn) = connection.as_mut() else {
            return Err(ServerError::remote("The connection was lost earlier"));
        };
        match conn.round_trip(req) {
            Ok(response) => response,
            Err(err) => {
                *connection = None;
                Err(ServerError::remote(err))
            }
        }
    }
}

impl Drop for RemoteServer {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.get_mut() {
            // Best effort, the server cleans up after a hang-up as well.
            let _ = serde_json::to_writer(&mut conn.writer, &Request::Bye);
            let _ = writeln!(conn.writer);
            let _ = conn.writer.flush();
        }
    }
}

impl GameServer for RemoteServer {
    fn acquire_ticket(&self) -> Result<Ticket, ServerError> {
        self.call(MatchCall::AcquireTicket)
    }

    fn release_ticket(&self, ticket: Ticket) -> Result<(), ServerError> {
        self.call::<Okay>(MatchCall::ReleaseTicket { ticket })
            .map(|_| ())
    }

    fn register_player(
        &self,
        name: &str,
        ticket: Ticket,
    ) -> Result<PlayerDescriptor, ServerError> {
        self.call(MatchCall::RegisterPlayer {
            player_name: String::from(name),
            ticket,
        })
    }

    fn new_match(&self, ticket: Ticket) -> Result<(), ServerError> {
        self.call::<Okay>(MatchCall::NewMatch { ticket }).map(|_| ())
    }

    fn end_match(&self, ticket: Ticket) -> Result<(), ServerError> {
        self.call::<Okay>(MatchCall::EndMatch { ticket }).map(|_| ())
    }

    fn is_running(&self) -> Result<bool, ServerError> {
        self.call(MatchCall::IsRunning)
    }

    fn list_players(&self) -> Result<Vec<PlayerRecord>, ServerError> {
        self.call(MatchCall::ListPlayers)
    }

    fn state_immediate(&self) -> Result<Option<Board>, ServerError> {
        self.call(MatchCall::GetStateImmediate)
    }

    fn state_blocking(
        &self,
        mark: PlayerMark,
        ticket: Ticket,
    ) -> Result<Option<Board>, ServerError> {
        self.call(MatchCall::GetStateBlocking { mark, ticket })
    }

    fn submit_move(
        &self,
        column: usize,
        mark: PlayerMark,
        expected: &Board,
        ticket: Ticket,
    ) -> Result<(), ServerError> {
        self.call::<Okay>(MatchCall::SubmitMove {
            column,
            mark,
            expected: expected.clone(),
            ticket,
        })
        .map(|_| ())
    }
}
