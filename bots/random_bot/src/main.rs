use clap::Parser;
use fourinaline::{Board, PlayerMark};
use fourinaline_bot_utils::{initialize_logging, play_remote, Bot, SessionOptions};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
struct Args {
    /// Address of the match server
    #[arg(short, long, default_value = "127.0.0.1:4444")]
    address: String,

    /// Name of the match to join
    #[arg(short, long, default_value = "default")]
    match_name: String,

    /// Player name; a suffix is added if it's taken
    #[arg(short, long, default_value = "random")]
    name: String,

    /// Host the match before joining it
    #[arg(long, default_value_t = false)]
    create_match: bool,

    /// Start a new match whenever none is running (only the match owner can)
    #[arg(long, default_value_t = false)]
    auto_start: bool,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    initialize_logging(args.log_level);
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed);
    let rng = StdRng::seed_from_u64(seed);

    let options = SessionOptions {
        address: args.address,
        match_name: args.match_name,
        player_name: args.name,
        create_match: args.create_match,
        auto_start: args.auto_start,
    };
    play_remote(&options, &mut RandomBot { rng })
}

struct RandomBot {
    rng: StdRng,
}

impl Bot for RandomBot {
    fn choose_column(&mut self, board: &Board, _mark: PlayerMark) -> Option<usize> {
        board.playable_columns().choose(&mut self.rng).copied()
    }
}
