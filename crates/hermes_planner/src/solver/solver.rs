use std::time::{Duration, Instant};

use crate::{
    config::solver_configuration::SolverConfiguration,
    error::SolveError,
    problem::{problem_snapshot::ProblemSnapshot, route_plan::RoutePlan},
};

use super::{score::Score, stop_signal::StopSignal};

/// Creates solvers from a resolved configuration.
pub trait SolverFactory: Send + Sync + 'static {
    fn create_solver(&self, config: &SolverConfiguration) -> Box<dyn Solver>;
}

/// The narrow surface the planner needs from an optimization library.
pub trait Solver: Send + 'static {
    /// Seeds the solver. Rejecting the problem here is reported as a start failure.
    fn start(
        &mut self,
        problem: &ProblemSnapshot,
        initial: Option<RoutePlan>,
    ) -> Result<(), SolveError>;

    /// Runs one solve cycle, blocking until it converges or
    /// [`SolveContext::should_terminate`] turns true.
    ///
    /// The first report should be the starting plan, seeded or not. After a
    /// restart it is what listeners compare later improvements against.
    fn solve(&mut self, context: &mut SolveContext<'_>) -> Result<(), SolveError>;
}

type BestSolutionCallback<'a> = dyn FnMut(Score, RoutePlan) + 'a;

pub struct SolveContext<'a> {
    stop: &'a StopSignal,
    started: Instant,
    budget: Duration,
    on_best_solution: &'a mut BestSolutionCallback<'a>,
}

impl<'a> SolveContext<'a> {
    pub fn new(
        stop: &'a StopSignal,
        budget: Duration,
        on_best_solution: &'a mut BestSolutionCallback<'a>,
    ) -> Self {
        Self {
            stop,
            started: Instant::now(),
            budget,
            on_best_solution,
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    pub fn is_time_exhausted(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    pub fn should_terminate(&self) -> bool {
        self.is_stop_requested() || self.is_time_exhausted()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn report_best(&mut self, score: Score, plan: RoutePlan) {
        (self.on_best_solution)(score, plan);
    }
}
