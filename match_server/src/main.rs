use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use alpha_beta_bot::{AlphaBeta, WindowEvaluator};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use fourinaline::{GameServer, PlayerMark, Ticket};
use fourinaline_bot_utils::Client;
use match_server::{serve, CoordinatorConfig, MatchCoordinator, PlayerConfig, SessionRegistry};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOCAL_MATCH_NAME: &str = "local";
const REFEREE_POLL_PERIOD: Duration = Duration::from_millis(5);

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info", global = true)]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Command {
    /// Host matches for remote players
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:4444")]
        bind: String,

        /// Tear a match down after this many seconds without activity
        #[arg(long, default_value_t = 30 * 60)]
        inactivity_timeout_secs: u64,
    },
    /// Let two computer players play each other in this process
    Local {
        /// Path to the config JSON files of the two players
        #[clap(num_args(2), value_delimiter = ' ')]
        player_configs: Vec<PathBuf>,

        /// How many games to play
        #[arg(short, long, default_value_t = 10)]
        num_games: usize,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Default)]
struct Tally {
    wins: [usize; PlayerMark::COUNT],
    ties: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    match args.command {
        Command::Serve {
            bind,
            inactivity_timeout_secs,
        } => {
            let registry = Arc::new(SessionRegistry::new(CoordinatorConfig {
                inactivity_timeout: Duration::from_secs(inactivity_timeout_secs),
            }));
            let listener =
                TcpListener::bind(&bind).with_context(|| format!("Could not bind to {}", bind))?;
            serve(listener, registry)
        }
        Command::Local {
            player_configs,
            num_games,
            seed,
        } => {
            // Get a random seed
            let seed = seed.unwrap_or_else(rand::random);
            info!(seed);
            let mut rng = StdRng::seed_from_u64(seed);

            let mut player_configs = player_configs
                .iter()
                .map(|path| PlayerConfig::load(path))
                .collect::<Result<Vec<PlayerConfig>, anyhow::Error>>()?;
            // The first to register plays red and moves first in every game.
            player_configs.shuffle(&mut rng);
            play_local(&player_configs, num_games, &mut rng)
        }
    }
}

fn play_local(
    player_configs: &[PlayerConfig],
    num_games: usize,
    rng: &mut StdRng,
) -> anyhow::Result<()> {
    let coordinator = MatchCoordinator::new(LOCAL_MATCH_NAME, CoordinatorConfig::default(), None);

    let mut seats = Vec::with_capacity(player_configs.len());
    for config in player_configs {
        let bot = AlphaBeta::new(
            config.search_config()?,
            WindowEvaluator,
            StdRng::seed_from_u64(rng.gen()),
        )?;
        let client = Client::connect(Arc::clone(&coordinator), &config.nick)?;
        seats.push((client, bot));
    }
    let owner = seats
        .iter()
        .find(|(client, _)| client.is_owner())
        .map(|(client, _)| client.ticket())
        .context("Nobody owns the local match")?;
    let mut names = [String::new(), String::new()];
    for (client, _) in &seats {
        names[client.player().mark().index()] = client.player().name().to_string();
    }

    let tally = thread::scope(|s| -> anyhow::Result<Tally> {
        let handles: Vec<_> = seats
            .into_iter()
            .map(|(mut client, mut bot)| s.spawn(move || client.run(&mut bot)))
            .collect();
        let tally = referee(&coordinator, owner, num_games);
        // Ends the players' loops.
        let final_scores = coordinator.list_players();
        coordinator.shutdown();
        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow!("A player thread panicked"))??;
        }
        for player in final_scores? {
            debug!(player = player.name(), score = player.score(), "Final score");
        }
        tally
    })?;

    eprintln!(
        "End result:\n- {} wins by {}\n- {} wins by {}\n- {} ties",
        tally.wins[0], names[0], tally.wins[1], names[1], tally.ties
    );
    Ok(())
}

/// Starts `num_games` matches one after the other and records how each one ended.
fn referee(
    coordinator: &MatchCoordinator,
    owner: Ticket,
    num_games: usize,
) -> anyhow::Result<Tally> {
    let mut tally = Tally::default();
    for game_idx in 0..num_games {
        coordinator.new_match(owner)?;
        while coordinator.is_running()? {
            thread::sleep(REFEREE_POLL_PERIOD);
        }
        let board = coordinator
            .state_immediate()?
            .context("The match was abandoned")?;
        match board.winner() {
            Some(mark) => {
                debug!(winner = %mark, game_idx);
                tally.wins[mark.index()] += 1;
            }
            None => {
                debug!(game_idx, "Tie");
                tally.ties += 1;
            }
        }
        debug!("Final board:\n{}", board);
    }
    Ok(tally)
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().event_format(format))
        .with(filter)
        .init();
}
