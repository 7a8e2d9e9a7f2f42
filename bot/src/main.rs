use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sweeper_core::{CellCount, Coord, SolverMode};

use crate::config::{BotConfig, Preset};

mod autoplay;
mod config;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// TOML file with defaults for every other option
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Board size and mine count preset
    #[arg(short, long, value_enum)]
    preset: Option<Preset>,

    #[arg(long)]
    width: Option<Coord>,

    #[arg(long)]
    height: Option<Coord>,

    #[arg(short, long)]
    mines: Option<CellCount>,

    /// Number of games to play
    #[arg(short = 'n', long)]
    games: Option<u32>,

    /// "hybrid" or "pure-ai"
    #[arg(long)]
    mode: Option<SolverMode>,

    /// Force a base seed instead of random
    #[arg(short, long)]
    seed: Option<u64>,

    /// Estimator weights JSON
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Largest frontier segment to enumerate exactly
    #[arg(long)]
    max_segment: Option<usize>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Print every final board
    #[arg(long)]
    show: bool,
}

impl Args {
    fn bot_config(&self) -> Result<BotConfig> {
        let mut config = match &self.config {
            Some(path) => BotConfig::load(path)?,
            None => BotConfig::default(),
        };

        if let Some(preset) = self.preset {
            config.apply_preset(preset);
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(mines) = self.mines {
            config.mines = mines;
        }
        if let Some(games) = self.games {
            config.games = games;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.weights.is_some() {
            config.weights = self.weights.clone();
        }
        if let Some(max_segment) = self.max_segment {
            config.solver.max_segment_unknowns = max_segment;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    let config = args.bot_config()?;
    log::debug!("{:?}", config);

    let summary = autoplay::run(&config, |game, board, record| {
        if args.show {
            println!("Game {} {:?}:\n{}", game + 1, record.outcome, board);
        }
    })?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Could not serialize summary")?;
        println!("{json}");
    } else {
        print!("{}", summary.render());
    }
    Ok(())
}
