use super::search_state::{DEPOT, SearchState};

const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// **Intra-Route 2-Opt**
///
/// Reverses the visits between `from` and `to` (inclusive) when that removes
/// a crossing.
///
/// ```text
/// BEFORE:
///    ... (prev) --x--> [from] -> ... -> [to] --x--> (next) ...
///
/// AFTER:
///    ... (prev) -----> [to] -> ... -> [from] -----> (next) ...
/// ```
///
/// Distances are symmetric, so only the two boundary edges change.
pub fn two_opt_delta(state: &SearchState, route_index: usize, from: usize, to: usize) -> f64 {
    let route = &state.routes[route_index];
    let previous = if from == 0 { DEPOT } else { route[from - 1] };
    let next = route.get(to + 1).copied().unwrap_or(DEPOT);

    let current = state.matrix.distance(previous, route[from]) + state.matrix.distance(route[to], next);
    let reversed = state.matrix.distance(previous, route[to]) + state.matrix.distance(route[from], next);

    reversed - current
}

/// One first-improvement pass over every route. Each evaluated move consumes
/// one unit of `move_budget`. Returns the number of applied moves.
pub fn two_opt_pass(state: &mut SearchState, move_budget: &mut usize) -> usize {
    let mut applied = 0;

    for route_index in 0..state.routes.len() {
        let len = state.routes[route_index].len();
        if len < 2 {
            continue;
        }

        for from in 0..len - 1 {
            for to in (from + 1)..len {
                if *move_budget == 0 {
                    return applied;
                }
                *move_budget -= 1;

                if two_opt_delta(state, route_index, from, to) < -IMPROVEMENT_EPSILON {
                    state.routes[route_index][from..=to].reverse();
                    applied += 1;
                }
            }
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use crate::{
        config::solver_configuration::ConstraintWeights,
        engine::search_state::test_utils::line_problem,
        problem::{
            route_plan::{RoutePlan, VehicleRoute},
            vehicle::VehicleId,
            visit::VisitId,
        },
    };

    use super::*;

    fn zig_zag_state() -> SearchState {
        let problem = line_problem(4, 1);
        let plan = RoutePlan {
            routes: vec![VehicleRoute {
                vehicle_id: VehicleId::new(1),
                visits: [1, 3, 2, 4].into_iter().map(VisitId::new).collect(),
            }],
            unassigned: vec![],
        };
        SearchState::new(&problem, &plan).unwrap()
    }

    #[test]
    fn test_two_opt_untangles_route() {
        let mut state = zig_zag_state();
        let weights = ConstraintWeights::default();
        let before = state.score(&weights);

        let mut budget = 1_000;
        assert!(two_opt_pass(&mut state, &mut budget) > 0);

        assert!(state.score(&weights) < before);
        assert_eq!(state.routes()[0], vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_two_opt_respects_move_budget() {
        let mut state = zig_zag_state();

        let mut budget = 0;
        assert_eq!(two_opt_pass(&mut state, &mut budget), 0);
        assert_eq!(state.routes()[0], vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_optimal_route_is_left_alone() {
        let problem = line_problem(3, 1);
        let plan = RoutePlan {
            routes: vec![VehicleRoute {
                vehicle_id: VehicleId::new(1),
                visits: [1, 2, 3].into_iter().map(VisitId::new).collect(),
            }],
            unassigned: vec![],
        };
        let mut state = SearchState::new(&problem, &plan).unwrap();

        let mut budget = 100;
        assert_eq!(two_opt_pass(&mut state, &mut budget), 0);
        assert_eq!(budget, 97);
    }
}
