use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hermes_planner::config::properties::{PlannerProperties, parse_duration};
use mimalloc::MiMalloc;

use crate::run::RunArgs;

mod check_config;
mod problem_file;
mod run;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,

    /// Directory with a user supplied solver configuration (overrides APP_SOLVER_CONFIG_DIR)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Ceiling of one solve cycle, e.g. "30s", "5m", "PT1M" (overrides APP_OPTIMIZER_TIMEOUT)
    #[arg(long, global = true, value_parser = parse_duration)]
    optimizer_timeout: Option<jiff::SignedDuration>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replays a problem file against the run controller and prints every forwarded best solution
    Run {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Resolves the solver configuration and prints where it came from
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let mut properties = PlannerProperties::from_env()?;
    if let Some(config_dir) = cli.config_dir {
        properties.solver_config_dir = config_dir;
    }
    if let Some(timeout) = cli.optimizer_timeout {
        properties.optimizer_timeout = timeout;
    }

    match cli.command {
        Commands::Run { args } => run::run(args, properties).await?,
        Commands::CheckConfig => check_config::run(properties)?,
    }

    Ok(())
}
