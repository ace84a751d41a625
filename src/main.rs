mod tui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use slider_puzzle_engine::config::{Difficulty, GameConfig};
use slider_puzzle_engine::puzzle::PuzzleState;
use slider_puzzle_engine::shuffle::Shuffler;
use slider_puzzle_engine::worker::{self, SolverRequest};

/// Sliding puzzle with a background hint solver.
#[derive(Parser)]
#[command(about, long_about = None, version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON game configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Grid size (overrides the configuration)
    #[arg(short = 'n', long, global = true)]
    size: Option<usize>,

    /// Difficulty preset for the hint budget
    #[arg(value_enum, short = 'f', long, global = true)]
    difficulty: Option<Difficulty>,

    /// Seed for reproducible shuffles
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Enable debug messages
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Play in the terminal (default)
    Play,
    /// Print a solvable board as a solver request
    Shuffle,
    /// Answer one solver request read from a file or stdin
    Solve {
        /// Request file; stdin when omitted
        input: Option<PathBuf>,

        /// Print every intermediate board
        #[arg(long, default_value_t = false)]
        steps: bool,
    },
}

fn main() -> Result<()> {
    let args: Args = Args::parse();

    if args.debug {
        env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    let config = load_config(&args)?;
    debug!("Configuration: {config:?}");
    let mut shuffler = match args.seed {
        Some(seed) => Shuffler::with_seed(seed),
        None => Shuffler::new(),
    };

    match args.command.unwrap_or(Command::Play) {
        Command::Play => tui::run(&config, &mut shuffler),
        Command::Shuffle => shuffle(&config, &mut shuffler),
        Command::Solve { input, steps } => solve(&config, input, steps),
    }
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::from_json_file(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => GameConfig::default(),
    };

    if let Some(size) = args.size {
        config.grid_size = size;
    }
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
        config.hint_percentage = None;
    }
    config.validate()?;
    Ok(config)
}

fn shuffle(config: &GameConfig, shuffler: &mut Shuffler) -> Result<()> {
    let state = shuffler.shuffle(config.grid_size)?;
    eprintln!("{state}");
    let request = SolverRequest::solve(1, &state);
    println!("{}", serde_json::to_string(&request)?);
    Ok(())
}

fn solve(config: &GameConfig, input: Option<PathBuf>, steps: bool) -> Result<()> {
    let json = match input {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let request: SolverRequest = serde_json::from_str(&json).context("malformed request")?;
    let SolverRequest::Solve {
        request_id,
        tiles,
        grid_size,
    } = request
    else {
        bail!("expected a solve request");
    };

    let Some(reply) = worker::answer(request_id, &tiles, grid_size, &config.solver, &|| false)
    else {
        bail!("search was cancelled");
    };
    println!("{}", serde_json::to_string(&reply)?);

    if steps && reply.success {
        let mut state = PuzzleState::from_tiles(grid_size, &tiles)?;
        eprintln!("{state}");
        for mv in &reply.path {
            let Some(next) = state.apply(*mv) else {
                bail!("solver produced an illegal move {mv}");
            };
            state = next;
            eprintln!("{mv}\n{state}");
        }
        if reply.found {
            eprintln!("Solved in {} moves", reply.path.len());
        }
    }
    Ok(())
}
