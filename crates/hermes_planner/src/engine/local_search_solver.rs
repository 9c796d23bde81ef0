use tracing::{debug, info};

use crate::{
    config::solver_configuration::{ConstraintWeights, PhaseConfig, SolverConfiguration},
    error::SolveError,
    problem::{problem_snapshot::ProblemSnapshot, route_plan::RoutePlan},
    solver::{
        score::Score,
        solver::{SolveContext, Solver, SolverFactory},
    },
};

use super::{construction, search_state::SearchState, two_opt};

const DEFAULT_MOVE_LIMIT: usize = 100_000;

/// Builds [`LocalSearchSolver`]s for the phases and weights of a configuration.
#[derive(Debug, Default, Clone)]
pub struct LocalSearchSolverFactory;

impl SolverFactory for LocalSearchSolverFactory {
    fn create_solver(&self, config: &SolverConfiguration) -> Box<dyn Solver> {
        Box::new(LocalSearchSolver::new(
            config.constraint_weights.clone(),
            config.phases.clone(),
        ))
    }
}

/// Cheapest insertion followed by intra-route 2-opt.
pub struct LocalSearchSolver {
    weights: ConstraintWeights,
    phases: Vec<PhaseConfig>,
    state: Option<SearchState>,
}

impl LocalSearchSolver {
    pub fn new(weights: ConstraintWeights, phases: Vec<PhaseConfig>) -> Self {
        Self {
            weights,
            phases,
            state: None,
        }
    }
}

impl Solver for LocalSearchSolver {
    fn start(
        &mut self,
        problem: &ProblemSnapshot,
        initial: Option<RoutePlan>,
    ) -> Result<(), SolveError> {
        if problem.visits().is_empty() {
            return Err(SolveError::Rejected(String::from("problem has no visits")));
        }

        let seed = match initial {
            Some(plan) => plan.reconcile(problem),
            None => RoutePlan::unassigned(problem),
        };

        let state = SearchState::new(problem, &seed)
            .ok_or_else(|| SolveError::Rejected(String::from("problem has no depot")))?;

        debug!(
            visits = problem.visits().len(),
            vehicles = problem.vehicles().len(),
            seeded = seed.assigned_count(),
            "Local search solver started"
        );

        self.state = Some(state);
        Ok(())
    }

    fn solve(&mut self, context: &mut SolveContext<'_>) -> Result<(), SolveError> {
        let Some(state) = self.state.as_mut() else {
            return Err(SolveError::Failed(String::from(
                "solve called before the solver was started",
            )));
        };

        let mut best = state.score(&self.weights);
        context.report_best(best, state.to_route_plan());

        for phase in &self.phases {
            if context.should_terminate() {
                break;
            }

            match phase {
                PhaseConfig::ConstructionHeuristic => {
                    let inserted = construction::insert_unassigned(state, &self.weights, context);
                    debug!(inserted, "Construction heuristic finished");
                }
                PhaseConfig::LocalSearch { move_limit } => {
                    let mut budget = move_limit.unwrap_or(DEFAULT_MOVE_LIMIT);
                    while budget > 0 && !context.should_terminate() {
                        if two_opt::two_opt_pass(state, &mut budget) == 0 {
                            break;
                        }

                        report_if_better(state, &self.weights, &mut best, context);
                    }
                }
            }

            report_if_better(state, &self.weights, &mut best, context);
        }

        info!(
            score = %best,
            elapsed_ms = context.elapsed().as_millis() as u64,
            "Solve cycle finished"
        );

        Ok(())
    }
}

fn report_if_better(
    state: &SearchState,
    weights: &ConstraintWeights,
    best: &mut Score,
    context: &mut SolveContext<'_>,
) {
    let score = state.score(weights);
    if score.is_better_than(best) {
        *best = score;
        context.report_best(score, state.to_route_plan());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        engine::search_state::test_utils::line_problem,
        problem::{
            route_plan::VehicleRoute,
            vehicle::VehicleId,
            visit::VisitId,
        },
        solver::stop_signal::StopSignal,
    };

    use super::*;

    fn solver() -> LocalSearchSolver {
        LocalSearchSolver::new(
            ConstraintWeights::default(),
            vec![
                PhaseConfig::ConstructionHeuristic,
                PhaseConfig::LocalSearch {
                    move_limit: Some(10_000),
                },
            ],
        )
    }

    fn solve(solver: &mut LocalSearchSolver, stop: &StopSignal) -> Vec<(Score, RoutePlan)> {
        let mut reported = vec![];
        let mut on_best = |score: Score, plan: RoutePlan| reported.push((score, plan));
        let mut context = SolveContext::new(stop, Duration::from_secs(10), &mut on_best);
        solver.solve(&mut context).unwrap();
        reported
    }

    #[test]
    fn test_rejects_problem_without_depot_or_visits() {
        let mut solver = solver();

        let no_visits = line_problem(0, 1);
        assert!(matches!(
            solver.start(&no_visits, None),
            Err(SolveError::Rejected(_))
        ));

        let no_depot = ProblemSnapshot::new(None, line_problem(2, 1).visits().to_vec(), vec![]);
        assert!(matches!(
            solver.start(&no_depot, None),
            Err(SolveError::Rejected(_))
        ));
    }

    #[test]
    fn test_solve_before_start_fails() {
        let stop = StopSignal::new();
        let mut on_best = |_: Score, _: RoutePlan| {};
        let mut context = SolveContext::new(&stop, Duration::from_secs(1), &mut on_best);

        assert!(matches!(
            solver().solve(&mut context),
            Err(SolveError::Failed(_))
        ));
    }

    #[test]
    fn test_reports_strictly_improving_scores() {
        let problem = line_problem(6, 2);
        let mut solver = solver();
        solver.start(&problem, None).unwrap();

        let reported = solve(&mut solver, &StopSignal::new());

        assert!(reported.len() >= 2);
        for pair in reported.windows(2) {
            assert!(pair[1].0.is_better_than(&pair[0].0));
        }

        let (final_score, final_plan) = reported.last().unwrap();
        assert!(final_score.is_feasible());
        assert!(final_plan.unassigned.is_empty());
        assert_eq!(final_plan.assigned_count(), 6);
    }

    #[test]
    fn test_seed_is_reconciled_and_kept() {
        let problem = line_problem(3, 1);
        let seed = RoutePlan {
            routes: vec![VehicleRoute {
                vehicle_id: VehicleId::new(1),
                visits: vec![VisitId::new(1), VisitId::new(2), VisitId::new(99)],
            }],
            unassigned: vec![],
        };

        let mut solver = solver();
        solver.start(&problem, Some(seed)).unwrap();
        let reported = solve(&mut solver, &StopSignal::new());

        let (first_score, first_plan) = &reported[0];
        assert_eq!(first_score.hard_score, 1.0);
        assert_eq!(first_plan.routes[0].visits, vec![VisitId::new(1), VisitId::new(2)]);
        assert_eq!(first_plan.unassigned, vec![VisitId::new(3)]);
    }

    #[test]
    fn test_stop_requested_reports_seed_only() {
        let problem = line_problem(3, 1);
        let mut solver = solver();
        solver.start(&problem, None).unwrap();

        let stop = StopSignal::new();
        stop.request_stop();
        let reported = solve(&mut solver, &stop);

        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].0, Score::hard(3.0));
    }
}
