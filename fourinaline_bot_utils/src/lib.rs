mod client;
mod remote;
pub use client::*;
pub use remote::*;

use fourinaline::{Board, PlayerMark, ServerError};
use tracing::info;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// A trait to simplify writing computer players.
pub trait Bot {
    /// Called whenever a fresh board shows up, before the first move on it.
    fn new_match(&mut self, _mark: PlayerMark) {}

    /// Picks the column to play on `board`, where it is `mark`'s turn.
    ///
    /// Returning `None` means the bot gives up on this turn.
    fn choose_column(&mut self, board: &Board, mark: PlayerMark) -> Option<usize>;
}

/// Where a bot process plays, and under which name.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// `host:port` of the match server.
    pub address: String,
    pub match_name: String,
    pub player_name: String,
    /// Host the match first. Joining an existing match of that name is fine too.
    pub create_match: bool,
    /// Start a new match whenever none is running, if this player owns the match.
    pub auto_start: bool,
}

/// Connects to a match server and plays with `bot` until the match goes away.
pub fn play_remote<B: Bot>(options: &SessionOptions, bot: &mut B) -> anyhow::Result<()> {
    let server = RemoteServer::connect(options.address.as_str(), &options.match_name)?;
    if options.create_match {
        match server.create_match() {
            Ok(()) => info!(match_name = %server.match_name(), "Match created"),
            Err(ServerError::MatchAlreadyExists { .. }) => {
                info!(match_name = %server.match_name(), "Joining the existing match")
            }
            Err(err) => return Err(err.into()),
        }
    }
    let mut client = Client::connect(server, &options.player_name)?.auto_start(options.auto_start);
    client.run(bot)?;
    Ok(())
}

/// Sets up logging for a bot process. Logs go to stderr.
pub fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
