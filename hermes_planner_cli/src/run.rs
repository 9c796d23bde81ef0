use std::{path::PathBuf, sync::Arc};

use clap::{Args, ValueEnum};
use hermes_planner::{
    config::{
        properties::{PlannerProperties, parse_duration},
        resolver::ConfigurationResolver,
        resource_loader::ResourceLoader,
    },
    controller::{
        controller_state::ControllerState,
        publisher::{ChannelPublisher, LoggingPublisher, RoutePublisher},
        run_controller::RunController,
    },
    engine::local_search_solver::LocalSearchSolverFactory,
    executor::execution_gate::ExecutionGate,
    solver::{best_solution_event::BestSolutionEvent, session::SessionBuilder},
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::problem_file::read_fact_changes;

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document per forwarded best solution on stdout
    Json,
    /// Forwarded best solutions are only logged
    Log,
}

#[derive(Args)]
pub struct RunArgs {
    /// Problem file: `{ depot, visits, vehicles }` or a list of fact changes
    #[arg(short, long)]
    input: PathBuf,

    /// Stop after this long, e.g. "10s". Runs until interrupted otherwise.
    #[arg(short, long, value_parser = parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

pub async fn run(args: RunArgs, properties: PlannerProperties) -> Result<(), anyhow::Error> {
    let changes = read_fact_changes(&args.input)?;

    // Configuration problems are fatal, so surface them before anything runs.
    let resolver = ConfigurationResolver::new(properties, ResourceLoader::new());
    let config = resolver.resolve()?;
    info!(
        "Using solver configuration {} ({} second budget)",
        config.source_location,
        config.termination_budget.as_secs()
    );

    let mut solutions = None;
    let publisher: Arc<dyn RoutePublisher> = match args.format {
        OutputFormat::Json => {
            let publisher = ChannelPublisher::new();
            solutions = Some(publisher.subscribe());
            Arc::new(publisher)
        }
        OutputFormat::Log => Arc::new(LoggingPublisher),
    };

    let (handle, controller) = RunController::spawn(
        resolver,
        SessionBuilder::new(Arc::new(LocalSearchSolverFactory)),
        ExecutionGate::new(),
        publisher,
    );

    info!("Replaying {} fact changes from {:?}", changes.len(), args.input);
    for change in changes {
        handle.apply(change)?;
    }

    let deadline = async {
        match args.timeout {
            Some(timeout) => tokio::time::sleep(timeout.unsigned_abs()).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                info!("Interrupted");
                break;
            }
            _ = &mut deadline => {
                info!("Run timeout reached");
                break;
            }
            event = next_solution(&mut solutions) => match event {
                Some(event) => println!("{}", serde_json::to_string(&event)?),
                None => break,
            },
        }
    }

    handle.shutdown()?;
    let status = handle.wait_for_state(ControllerState::Stopped).await?;
    match status.best_score {
        Some(score) => info!("Stopped after {} sessions, best score {score}", status.generation),
        None => info!("Stopped after {} sessions without a solution", status.generation),
    }
    if let Some(error) = status.last_error {
        warn!("Last run error: {error}");
    }

    drop(handle);
    controller.await?;

    Ok(())
}

async fn next_solution(
    solutions: &mut Option<mpsc::UnboundedReceiver<BestSolutionEvent>>,
) -> Option<BestSolutionEvent> {
    match solutions {
        Some(solutions) => solutions.recv().await,
        None => std::future::pending().await,
    }
}
