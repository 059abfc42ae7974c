use alpha_beta_bot::{AlphaBeta, Level, SearchConfig, WindowEvaluator};
use clap::Parser;
use fourinaline_bot_utils::{initialize_logging, play_remote, SessionOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
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
    #[arg(short, long, default_value = "alpha-beta")]
    name: String,

    /// Host the match before joining it
    #[arg(long, default_value_t = false)]
    create_match: bool,

    /// Start a new match whenever none is running (only the match owner can)
    #[arg(long, default_value_t = false)]
    auto_start: bool,

    /// Strength preset
    #[arg(long, value_enum, default_value_t = Level::Intermediate)]
    level: Level,

    /// Search depth, overriding the level
    #[arg(long)]
    depth: Option<u32>,

    /// Chance of switching to a later column that scores as well as the best one
    #[arg(long)]
    tie_break_probability: Option<f64>,

    /// Entries in the transposition cache, 0 disables it
    #[arg(long)]
    cache_capacity: Option<usize>,

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
    let mut config = SearchConfig::from(args.level);
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
    if let Some(probability) = args.tie_break_probability {
        config.tie_break_probability = probability;
    }
    if let Some(capacity) = args.cache_capacity {
        config.cache_capacity = capacity;
    }
    let mut bot = AlphaBeta::new(config, WindowEvaluator, StdRng::seed_from_u64(seed))?;

    let options = SessionOptions {
        address: args.address,
        match_name: args.match_name,
        player_name: args.name,
        create_match: args.create_match,
        auto_start: args.auto_start,
    };
    play_remote(&options, &mut bot)
}
