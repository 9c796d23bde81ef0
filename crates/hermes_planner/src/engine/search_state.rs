use fxhash::FxHashMap;

use crate::{
    config::solver_configuration::ConstraintWeights,
    problem::{
        problem_snapshot::ProblemSnapshot,
        route_plan::{RoutePlan, VehicleRoute},
        vehicle::VehicleId,
        visit::VisitId,
    },
    solver::score::Score,
};

use super::distance_matrix::DistanceMatrix;

/// Node of the depot in the distance matrix. Visits follow from 1.
pub const DEPOT: usize = 0;

/// Mutable solution the engine works on, with visits addressed by node index.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub(crate) matrix: DistanceMatrix,
    visit_ids: Vec<VisitId>,
    demands: Vec<u32>,
    vehicles: Vec<(VehicleId, Option<u32>)>,
    pub(crate) routes: Vec<Vec<usize>>,
    pub(crate) unassigned: Vec<usize>,
}

impl SearchState {
    /// Builds the state from a plan that was reconciled against `problem`.
    /// Returns `None` without a depot.
    pub fn new(problem: &ProblemSnapshot, plan: &RoutePlan) -> Option<Self> {
        let depot = problem.depot()?;

        let mut locations = Vec::with_capacity(problem.visits().len() + 1);
        let mut demands = Vec::with_capacity(problem.visits().len() + 1);
        locations.push(*depot.location());
        demands.push(0);

        let mut visit_ids = Vec::with_capacity(problem.visits().len());
        let mut nodes: FxHashMap<VisitId, usize> = FxHashMap::default();
        for visit in problem.visits() {
            nodes.insert(visit.id(), locations.len());
            locations.push(*visit.location());
            demands.push(visit.demand());
            visit_ids.push(visit.id());
        }

        let vehicles: Vec<(VehicleId, Option<u32>)> = problem
            .vehicles()
            .iter()
            .map(|vehicle| (vehicle.id(), vehicle.capacity()))
            .collect();

        let mut placed = vec![false; locations.len()];
        let routes: Vec<Vec<usize>> = vehicles
            .iter()
            .map(|(vehicle_id, _)| {
                plan.routes
                    .iter()
                    .find(|route| route.vehicle_id == *vehicle_id)
                    .map(|route| {
                        route
                            .visits
                            .iter()
                            .filter_map(|id| nodes.get(id).copied())
                            .filter(|&node| !std::mem::replace(&mut placed[node], true))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();

        let mut unassigned: Vec<usize> = plan
            .unassigned
            .iter()
            .filter_map(|id| nodes.get(id).copied())
            .filter(|&node| !std::mem::replace(&mut placed[node], true))
            .collect();
        unassigned.extend((1..locations.len()).filter(|&node| !placed[node]));

        Some(Self {
            matrix: DistanceMatrix::from_locations(&locations),
            visit_ids,
            demands,
            vehicles,
            routes,
            unassigned,
        })
    }

    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    pub fn unassigned(&self) -> &[usize] {
        &self.unassigned
    }

    pub fn route_distance(&self, route: &[usize]) -> f64 {
        let (Some(&first), Some(&last)) = (route.first(), route.last()) else {
            return 0.0;
        };

        self.matrix.distance(DEPOT, first)
            + route
                .windows(2)
                .map(|pair| self.matrix.distance(pair[0], pair[1]))
                .sum::<f64>()
            + self.matrix.distance(last, DEPOT)
    }

    pub fn route_load(&self, route_index: usize) -> u32 {
        self.routes[route_index]
            .iter()
            .map(|&node| self.demands[node])
            .sum()
    }

    fn overload(&self, route_index: usize) -> u32 {
        self.vehicles[route_index]
            .1
            .map(|capacity| self.route_load(route_index).saturating_sub(capacity))
            .unwrap_or(0)
    }

    /// Whether `node` can be added to the route without exceeding its capacity.
    pub fn fits(&self, route_index: usize, node: usize) -> bool {
        match self.vehicles[route_index].1 {
            Some(capacity) => self.route_load(route_index) + self.demands[node] <= capacity,
            None => true,
        }
    }

    /// Extra distance of inserting `node` before `position` in the route.
    pub fn insertion_delta(&self, route_index: usize, position: usize, node: usize) -> f64 {
        let route = &self.routes[route_index];
        let previous = if position == 0 {
            DEPOT
        } else {
            route[position - 1]
        };
        let next = route.get(position).copied().unwrap_or(DEPOT);

        self.matrix.distance(previous, node) + self.matrix.distance(node, next)
            - self.matrix.distance(previous, next)
    }

    pub fn score(&self, weights: &ConstraintWeights) -> Score {
        let overload: u32 = (0..self.routes.len())
            .map(|route_index| self.overload(route_index))
            .sum();
        let distance: f64 = self
            .routes
            .iter()
            .map(|route| self.route_distance(route))
            .sum();
        let used = self.routes.iter().filter(|route| !route.is_empty()).count();

        Score::new(
            self.unassigned.len() as f64 * weights.unassigned_visit
                + overload as f64 * weights.capacity_overload,
            distance * weights.distance_per_meter + used as f64 * weights.vehicle_used,
        )
    }

    pub fn to_route_plan(&self) -> RoutePlan {
        let visit_id = |node: &usize| self.visit_ids[node - 1];

        RoutePlan {
            routes: self
                .vehicles
                .iter()
                .zip(&self.routes)
                .map(|((vehicle_id, _), route)| VehicleRoute {
                    vehicle_id: *vehicle_id,
                    visits: route.iter().map(visit_id).collect(),
                })
                .collect(),
            unassigned: self.unassigned.iter().map(visit_id).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::problem::{
        location::Location,
        vehicle::{Depot, Vehicle},
        visit::Visit,
    };

    use super::*;

    /// Visits spread along a line east of the depot.
    pub fn line_problem(visits: u64, vehicles: u64) -> ProblemSnapshot {
        ProblemSnapshot::new(
            Some(Depot::new(Location::from_lat_lon(50.0, 4.0))),
            (1..=visits)
                .map(|id| {
                    Visit::new(
                        VisitId::new(id),
                        Location::from_lat_lon(50.0, 4.0 + id as f64 * 0.01),
                    )
                })
                .collect(),
            (1..=vehicles)
                .map(|id| Vehicle::new(VehicleId::new(id)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{test_utils::line_problem, *};

    #[test]
    fn test_state_from_unassigned_plan() {
        let problem = line_problem(3, 2);
        let state = SearchState::new(&problem, &RoutePlan::unassigned(&problem)).unwrap();

        assert_eq!(state.routes().len(), 2);
        assert!(state.routes().iter().all(Vec::is_empty));
        assert_eq!(state.unassigned(), &[1, 2, 3]);

        let score = state.score(&ConstraintWeights::default());
        assert_eq!(score, Score::new(3.0, 0.0));
    }

    #[test]
    fn test_state_round_trips_a_reconciled_plan() {
        let problem = line_problem(3, 1);
        let plan = RoutePlan {
            routes: vec![VehicleRoute {
                vehicle_id: VehicleId::new(1),
                visits: vec![VisitId::new(2), VisitId::new(1)],
            }],
            unassigned: vec![VisitId::new(3)],
        };

        let state = SearchState::new(&problem, &plan).unwrap();

        assert_eq!(state.to_route_plan(), plan);
        let distance = state.route_distance(&state.routes()[0]);
        assert!((distance - plan.routes[0].distance(&problem)).abs() < 1e-6);
    }

    #[test]
    fn test_state_requires_depot() {
        let problem = ProblemSnapshot::default();
        assert!(SearchState::new(&problem, &RoutePlan::default()).is_none());
    }
}
