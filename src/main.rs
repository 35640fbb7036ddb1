//! Michi: a minimalistic Go MCTS engine.
//!
//! ## Usage
//!
//! - `michi` - Show a demo
//! - `michi gtp` - Start GTP server for GUI integration
//! - `michi demo` - Let the engine play a few moves against itself
//!
//! Global flags (`--sims`, `--seed`, `--komi`, `--time`, `--param NAME=VALUE`,
//! `--log-level`) apply to both commands. Logs go to stderr; `RUST_LOG`
//! overrides `--log-level`.

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flexi_logger::Logger;

use michi_engine::config::Params;
use michi_engine::constants::{PASS_MOVE, RESIGN_MOVE};
use michi_engine::engine::Engine;
use michi_engine::gtp::GtpEngine;
use michi_engine::position::str_coord;

/// Michi: a minimalistic Go MCTS engine
#[derive(Parser)]
#[command(name = "michi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Simulations per move
    #[arg(long, global = true)]
    sims: Option<usize>,

    /// Random seed (0 seeds from system entropy)
    #[arg(long, global = true)]
    seed: Option<u32>,

    #[arg(long, global = true)]
    komi: Option<f32>,

    /// Thinking time per move in seconds
    #[arg(long, global = true)]
    time: Option<f64>,

    /// Set an engine parameter, e.g. `--param RAVE_EQUIV=2000` (repeatable)
    #[arg(long = "param", value_name = "NAME=VALUE", global = true)]
    params: Vec<String>,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the GTP (Go Text Protocol) server for use with GUI applications
    Gtp,
    /// Let the engine play against itself for a few moves
    Demo {
        /// Number of moves to play
        #[arg(long, default_value_t = 10)]
        moves: usize,
    },
}

impl Cli {
    fn params(&self) -> anyhow::Result<Params> {
        let mut params = Params::default();
        if let Some(sims) = self.sims {
            params.n_sims = sims;
        }
        if let Some(seed) = self.seed {
            params.random_seed = seed;
        }
        for assignment in &self.params {
            params
                .apply_assignment(assignment)
                .with_context(|| format!("bad --param {assignment}"))?;
        }
        Ok(params)
    }

    fn time_budget(&self) -> anyhow::Result<Option<Duration>> {
        self.time
            .map(|secs| Duration::try_from_secs_f64(secs).with_context(|| format!("bad --time {secs}")))
            .transpose()
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _logger = Logger::try_with_env_or_str(&cli.log_level)
        .context("invalid log level")?
        .format(flexi_logger::colored_default_format)
        .start()
        .context("cannot start logger")?;

    let mut engine = Engine::new(cli.params()?);
    if let Some(komi) = cli.komi {
        engine.set_komi(komi);
    }
    let time_budget = cli.time_budget()?;

    match cli.command {
        Some(Commands::Gtp) => {
            let mut gtp = GtpEngine::new(engine, time_budget);
            gtp.run().context("GTP session failed")?;
        }
        Some(Commands::Demo { moves }) => run_demo(engine, time_budget, moves),
        None => run_demo(engine, time_budget, 10),
    }
    Ok(())
}

fn run_demo(mut engine: Engine, time_budget: Option<Duration>, moves: usize) {
    println!("Michi: Minimalistic Go MCTS Engine\n");
    println!("{} simulations per move", engine.params().n_sims);

    for _ in 0..moves {
        let color = engine.to_play();
        let mv = engine.genmove(time_budget);
        println!("{color} plays {}", str_coord(mv));
        if mv == RESIGN_MOVE {
            break;
        }
        let history = engine.history();
        if history.len() >= 2 && history[history.len() - 2..].iter().all(|&(_, pt)| pt == PASS_MOVE) {
            break;
        }
    }
    println!("\n{}", engine.position());
}
