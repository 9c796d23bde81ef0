#![allow(dead_code)]

use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use hermes_planner::{
    config::{
        properties::{PlannerProperties, parse_duration},
        resolver::ConfigurationResolver,
        resource_loader::ResourceLoader,
        solver_configuration::SolverConfiguration,
    },
    controller::{
        controller_handle::ControllerHandle,
        controller_state::{ControllerState, StateTransition},
        publisher::ChannelPublisher,
        run_controller::RunController,
    },
    error::SolveError,
    executor::execution_gate::ExecutionGate,
    problem::{
        location::Location,
        problem_snapshot::ProblemSnapshot,
        route_plan::RoutePlan,
        vehicle::{Vehicle, VehicleId},
        visit::{Visit, VisitId},
    },
    solver::{
        best_solution_event::BestSolutionEvent,
        score::Score,
        session::SessionBuilder,
        solver::{SolveContext, Solver, SolverFactory},
    },
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

pub const WAIT: Duration = Duration::from_secs(10);

/// What one scripted solver does. Scripts are handed out in creation order,
/// the fallback is used once they run out.
#[derive(Debug, Clone)]
pub struct Script {
    pub scores: Vec<Score>,
    pub reject: bool,
    /// Sleeps this long at the start of the solve cycle, ignoring stop requests.
    pub ignore_stop_for: Option<Duration>,
    /// Sleeps this long in `start`, keeping the session from acknowledging it.
    pub start_delay: Option<Duration>,
    pub step: Duration,
}

impl Script {
    pub fn scores(scores: &[f64]) -> Self {
        Self {
            scores: scores.iter().map(|&soft| Score::soft(soft)).collect(),
            reject: false,
            ignore_stop_for: None,
            start_delay: None,
            step: Duration::from_millis(5),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::scores(&[])
        }
    }

    pub fn stubborn(duration: Duration) -> Self {
        Self {
            ignore_stop_for: Some(duration),
            ..Self::scores(&[])
        }
    }

    pub fn slow_start(delay: Duration) -> Self {
        Self {
            start_delay: Some(delay),
            ..Self::scores(&[])
        }
    }
}

#[derive(Debug, Clone)]
pub struct StartRecord {
    pub visits: usize,
    pub vehicles: usize,
    pub seed: Option<RoutePlan>,
}

struct Shared {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Script,
    starts: Mutex<Vec<StartRecord>>,
    solving: AtomicUsize,
    peak_solving: AtomicUsize,
}

#[derive(Clone)]
pub struct ScriptedSolverFactory {
    shared: Arc<Shared>,
}

impl ScriptedSolverFactory {
    pub fn new(scripts: Vec<Script>, fallback: Script) -> Self {
        Self {
            shared: Arc::new(Shared {
                scripts: Mutex::new(scripts.into()),
                fallback,
                starts: Mutex::new(vec![]),
                solving: AtomicUsize::new(0),
                peak_solving: AtomicUsize::new(0),
            }),
        }
    }

    pub fn starts(&self) -> Vec<StartRecord> {
        self.shared.starts.lock().clone()
    }

    pub fn peak_solving(&self) -> usize {
        self.shared.peak_solving.load(Ordering::SeqCst)
    }
}

impl SolverFactory for ScriptedSolverFactory {
    fn create_solver(&self, _config: &SolverConfiguration) -> Box<dyn Solver> {
        let script = self
            .shared
            .scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.shared.fallback.clone());

        Box::new(ScriptedSolver {
            script,
            shared: Arc::clone(&self.shared),
            plan: RoutePlan::default(),
        })
    }
}

struct ScriptedSolver {
    script: Script,
    shared: Arc<Shared>,
    plan: RoutePlan,
}

impl Solver for ScriptedSolver {
    fn start(
        &mut self,
        problem: &ProblemSnapshot,
        initial: Option<RoutePlan>,
    ) -> Result<(), SolveError> {
        self.shared.starts.lock().push(StartRecord {
            visits: problem.visits().len(),
            vehicles: problem.vehicles().len(),
            seed: initial.clone(),
        });

        if let Some(delay) = self.script.start_delay {
            thread::sleep(delay);
        }

        if self.script.reject {
            return Err(SolveError::Rejected(String::from("scripted rejection")));
        }

        self.plan = initial
            .map(|plan| plan.reconcile(problem))
            .unwrap_or_else(|| RoutePlan::unassigned(problem));
        Ok(())
    }

    fn solve(&mut self, context: &mut SolveContext<'_>) -> Result<(), SolveError> {
        let solving = self.shared.solving.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak_solving.fetch_max(solving, Ordering::SeqCst);

        if let Some(duration) = self.script.ignore_stop_for {
            thread::sleep(duration);
        }

        for &score in &self.script.scores {
            if context.should_terminate() {
                break;
            }
            thread::sleep(self.script.step);
            context.report_best(score, self.plan.clone());
        }

        self.shared.solving.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Planner<F = ScriptedSolverFactory> {
    pub handle: ControllerHandle,
    pub gate: ExecutionGate,
    pub factory: F,
    pub solutions: mpsc::UnboundedReceiver<BestSolutionEvent>,
    pub transitions: broadcast::Receiver<StateTransition>,
}

/// Starts a run controller backed by the scripted factory and the embedded configuration.
pub fn start_planner(factory: ScriptedSolverFactory, timeout: &str) -> Planner {
    start_planner_with(factory, timeout)
}

pub fn start_planner_with<F>(factory: F, timeout: &str) -> Planner<F>
where
    F: SolverFactory + Clone,
{
    let properties = PlannerProperties {
        solver_config_dir: PathBuf::from("/nonexistent/hermes-planner/solver"),
        optimizer_timeout: parse_duration(timeout).unwrap(),
        ..PlannerProperties::default()
    };
    let resolver = ConfigurationResolver::new(properties, ResourceLoader::new());
    let gate = ExecutionGate::new();
    let publisher = ChannelPublisher::new();
    let solutions = publisher.subscribe();

    let (handle, _) = RunController::spawn(
        resolver,
        SessionBuilder::new(Arc::new(factory.clone())),
        gate.clone(),
        Arc::new(publisher),
    );
    let transitions = handle.subscribe_transitions();

    Planner {
        handle,
        gate,
        factory,
        solutions,
        transitions,
    }
}

pub fn depot() -> Location {
    Location::from_lat_lon(50.85, 4.35)
}

pub fn visit(id: u64) -> Visit {
    Visit::new(
        VisitId::new(id),
        Location::from_lat_lon(50.85 + id as f64 * 0.01, 4.35),
    )
}

pub fn vehicle(id: u64) -> Vehicle {
    Vehicle::new(VehicleId::new(id))
}

/// Sends the facts so the problem only becomes solvable with the last one.
pub fn submit_problem(handle: &ControllerHandle, visits: &[u64]) {
    handle.add_vehicle(vehicle(1)).unwrap();
    for &id in visits {
        handle.add_visit(visit(id)).unwrap();
    }
    handle.set_depot(depot()).unwrap();
}

pub async fn next_solution(
    solutions: &mut mpsc::UnboundedReceiver<BestSolutionEvent>,
) -> BestSolutionEvent {
    tokio::time::timeout(WAIT, solutions.recv())
        .await
        .expect("timed out waiting for a best solution")
        .unwrap()
}

/// Skips forwarded solutions until one matches `predicate`.
pub async fn solution_where<P>(
    solutions: &mut mpsc::UnboundedReceiver<BestSolutionEvent>,
    mut predicate: P,
) -> BestSolutionEvent
where
    P: FnMut(&BestSolutionEvent) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let event = solutions.recv().await.unwrap();
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for a matching best solution")
}

pub fn is_routed(event: &BestSolutionEvent, visit_id: VisitId) -> bool {
    event
        .route_plan
        .routes
        .iter()
        .any(|route| route.visits.contains(&visit_id))
}

/// Collects transitions until `to` is entered.
pub async fn transitions_until(
    transitions: &mut broadcast::Receiver<StateTransition>,
    to: ControllerState,
) -> Vec<StateTransition> {
    let mut seen = vec![];
    loop {
        let transition = tokio::time::timeout(WAIT, transitions.recv())
            .await
            .expect("timed out waiting for a transition")
            .unwrap();
        seen.push(transition);
        if transition.to == to {
            return seen;
        }
    }
}

pub fn states(transitions: &[StateTransition]) -> Vec<(ControllerState, ControllerState)> {
    transitions
        .iter()
        .map(|transition| (transition.from, transition.to))
        .collect()
}
