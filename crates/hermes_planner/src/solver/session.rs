use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::solver_configuration::SolverConfiguration,
    error::SolveError,
    problem::{problem_snapshot::ProblemSnapshot, route_plan::RoutePlan},
};

use super::{
    best_solution_event::BestSolutionEvent,
    score::Score,
    solver::{SolveContext, Solver, SolverFactory},
    stop_signal::StopSignal,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// What a session reports while it runs.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started { generation: u64 },
    BestSolution(BestSolutionEvent),
    Finished {
        generation: u64,
        outcome: SessionOutcome,
    },
}

impl SessionEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SessionEvent::Started { generation } | SessionEvent::Finished { generation, .. } => {
                *generation
            }
            SessionEvent::BestSolution(event) => event.generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Stopped,
    StartFailed(SolveError),
    Failed(SolveError),
}

/// One continuous solving attempt over a fixed problem baseline.
pub struct OptimizationSession {
    generation: u64,
    solver: Box<dyn Solver>,
    problem: ProblemSnapshot,
    seed: Option<RoutePlan>,
    daemon: bool,
    termination_budget: Duration,
    state: Arc<RwLock<SessionState>>,
    stop: StopSignal,
}

impl OptimizationSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_daemon(&self) -> bool {
        self.daemon
    }

    pub fn termination_budget(&self) -> Duration {
        self.termination_budget
    }

    pub fn problem(&self) -> &ProblemSnapshot {
        &self.problem
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub(crate) fn shared_state(&self) -> Arc<RwLock<SessionState>> {
        Arc::clone(&self.state)
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Runs the session to completion on the calling thread.
    ///
    /// A daemon session keeps holding its slot after the solve cycle ends and
    /// only returns once a stop was requested.
    pub fn run<F>(mut self, mut emit: F) -> SessionOutcome
    where
        F: FnMut(SessionEvent),
    {
        let generation = self.generation;

        if self.stop.is_requested() {
            debug!(generation, "Session stopped before it started");
            self.set_state(SessionState::Stopped);
            return SessionOutcome::Stopped;
        }

        self.set_state(SessionState::Starting);
        if let Err(error) = self.solver.start(&self.problem, self.seed.take()) {
            warn!(generation, %error, "Solver rejected the problem");
            self.set_state(SessionState::Stopped);
            return SessionOutcome::StartFailed(error);
        }

        self.set_state(SessionState::Running);
        emit(SessionEvent::Started { generation });
        info!(
            generation,
            visits = self.problem.visits().len(),
            vehicles = self.problem.vehicles().len(),
            budget_secs = self.termination_budget.as_secs(),
            "Session running"
        );

        let mut on_best_solution = |score: Score, plan: RoutePlan| {
            emit(SessionEvent::BestSolution(BestSolutionEvent::new(
                generation, score, plan,
            )));
        };
        let mut context =
            SolveContext::new(&self.stop, self.termination_budget, &mut on_best_solution);

        let result = self.solver.solve(&mut context);
        let elapsed = context.elapsed();

        if let Err(error) = result {
            self.set_state(SessionState::Stopped);
            return SessionOutcome::Failed(error);
        }

        if self.daemon && !self.stop.is_requested() {
            debug!(
                generation,
                elapsed_ms = elapsed.as_millis() as u64,
                "Solve cycle finished, waiting for stop"
            );
            self.stop.wait();
        }

        self.set_state(SessionState::Stopped);
        debug!(generation, "Session stopped");
        SessionOutcome::Stopped
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.state.write();
        // A requested stop is not overwritten by the session's own progress.
        if *current == SessionState::Stopping && state != SessionState::Stopped {
            return;
        }
        *current = state;
    }
}

/// Builds daemon sessions from a resolved configuration.
#[derive(Clone)]
pub struct SessionBuilder {
    factory: Arc<dyn SolverFactory>,
}

impl SessionBuilder {
    pub fn new(factory: Arc<dyn SolverFactory>) -> Self {
        Self { factory }
    }

    pub fn build(
        &self,
        config: &SolverConfiguration,
        problem: ProblemSnapshot,
        seed: Option<RoutePlan>,
        generation: u64,
    ) -> OptimizationSession {
        OptimizationSession {
            generation,
            solver: self.factory.create_solver(config),
            problem,
            seed,
            daemon: true,
            termination_budget: Duration::from_secs(config.termination_budget.as_secs()),
            state: Arc::new(RwLock::new(SessionState::Idle)),
            stop: StopSignal::new(),
        }
    }
}
