use crate::{config::solver_configuration::ConstraintWeights, solver::solver::SolveContext};

use super::search_state::SearchState;

/// Cheapest insertion: repeatedly inserts the unassigned visit whose best
/// feasible position adds the least cost. Visits that fit nowhere stay
/// unassigned. Returns the number of inserted visits.
pub fn insert_unassigned(
    state: &mut SearchState,
    weights: &ConstraintWeights,
    context: &SolveContext<'_>,
) -> usize {
    let mut inserted = 0;

    while !state.unassigned.is_empty() && !context.should_terminate() {
        let mut best: Option<(f64, usize, usize, usize)> = None;

        for (unassigned_index, &node) in state.unassigned.iter().enumerate() {
            for (route_index, route) in state.routes.iter().enumerate() {
                if !state.fits(route_index, node) {
                    continue;
                }

                let activation = if route.is_empty() {
                    weights.vehicle_used
                } else {
                    0.0
                };

                for position in 0..=route.len() {
                    let cost = state.insertion_delta(route_index, position, node)
                        * weights.distance_per_meter
                        + activation;

                    if best.is_none_or(|(best_cost, ..)| cost < best_cost) {
                        best = Some((cost, unassigned_index, route_index, position));
                    }
                }
            }
        }

        let Some((_, unassigned_index, route_index, position)) = best else {
            break;
        };

        let node = state.unassigned.remove(unassigned_index);
        state.routes[route_index].insert(position, node);
        inserted += 1;
    }

    inserted
}
