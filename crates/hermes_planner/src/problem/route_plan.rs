use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::{problem_snapshot::ProblemSnapshot, vehicle::VehicleId, visit::VisitId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VehicleRoute {
    pub vehicle_id: VehicleId,
    pub visits: Vec<VisitId>,
}

impl VehicleRoute {
    pub fn empty(vehicle_id: VehicleId) -> Self {
        Self {
            vehicle_id,
            visits: Vec::new(),
        }
    }

    /// Route length in meters, depot to depot.
    pub fn distance(&self, problem: &ProblemSnapshot) -> f64 {
        let Some(depot) = problem.depot() else {
            return 0.0;
        };

        let mut previous = depot.location();
        let mut distance = 0.0;
        for visit in self.visits.iter().filter_map(|&id| problem.visit(id)) {
            distance += previous.haversine_distance(visit.location());
            previous = visit.location();
        }

        distance + previous.haversine_distance(depot.location())
    }

    pub fn load(&self, problem: &ProblemSnapshot) -> u32 {
        self.visits
            .iter()
            .filter_map(|&id| problem.visit(id))
            .map(|visit| visit.demand())
            .sum()
    }
}

/// An assignment of visits to vehicles.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RoutePlan {
    pub routes: Vec<VehicleRoute>,
    pub unassigned: Vec<VisitId>,
}

impl RoutePlan {
    /// Every visit unassigned, every vehicle idle.
    pub fn unassigned(problem: &ProblemSnapshot) -> Self {
        Self {
            routes: problem
                .vehicles()
                .iter()
                .map(|vehicle| VehicleRoute::empty(vehicle.id()))
                .collect(),
            unassigned: problem.visits().iter().map(|visit| visit.id()).collect(),
        }
    }

    pub fn assigned_count(&self) -> usize {
        self.routes.iter().map(|route| route.visits.len()).sum()
    }

    pub fn non_empty_routes_iter(&self) -> impl Iterator<Item = &VehicleRoute> {
        self.routes.iter().filter(|route| !route.visits.is_empty())
    }

    pub fn total_distance(&self, problem: &ProblemSnapshot) -> f64 {
        self.routes.iter().map(|route| route.distance(problem)).sum()
    }

    /// Adapts the plan to a changed set of facts, keeping as much of the
    /// existing assignment as is still valid.
    ///
    /// Routes of removed vehicles are dropped and their visits become
    /// unassigned, removed visits disappear, new vehicles get an empty route
    /// and every visit not routed ends up in `unassigned`.
    pub fn reconcile(&self, problem: &ProblemSnapshot) -> RoutePlan {
        let mut routed = FxHashSet::default();

        let routes: Vec<VehicleRoute> = problem
            .vehicles()
            .iter()
            .map(|vehicle| {
                let visits = self
                    .routes
                    .iter()
                    .find(|route| route.vehicle_id == vehicle.id())
                    .map(|route| {
                        route
                            .visits
                            .iter()
                            .copied()
                            .filter(|&id| problem.visit(id).is_some() && routed.insert(id))
                            .collect()
                    })
                    .unwrap_or_default();

                VehicleRoute {
                    vehicle_id: vehicle.id(),
                    visits,
                }
            })
            .collect();

        // Keep the previous order of unassigned visits, then append new ones.
        let mut unassigned: Vec<VisitId> = self
            .unassigned
            .iter()
            .copied()
            .filter(|&id| problem.visit(id).is_some() && !routed.contains(&id))
            .collect();
        let mut seen: FxHashSet<VisitId> = unassigned.iter().copied().collect();
        for visit in problem.visits() {
            if !routed.contains(&visit.id()) && seen.insert(visit.id()) {
                unassigned.push(visit.id());
            }
        }

        RoutePlan { routes, unassigned }
    }
}

#[cfg(test)]
mod tests {
    use crate::problem::{
        fact_change::FactChange,
        location::Location,
        vehicle::{Vehicle, VehicleId},
        visit::Visit,
    };

    use super::*;

    fn problem(visits: &[u64], vehicles: &[u64]) -> ProblemSnapshot {
        ProblemSnapshot::new(
            None,
            visits
                .iter()
                .map(|&id| {
                    Visit::new(
                        VisitId::new(id),
                        Location::from_lat_lon(50.0 + id as f64 * 0.01, 4.0),
                    )
                })
                .collect(),
            vehicles
                .iter()
                .map(|&id| Vehicle::new(VehicleId::new(id)))
                .collect(),
        )
    }

    fn ids(ids: &[u64]) -> Vec<VisitId> {
        ids.iter().map(|&id| VisitId::new(id)).collect()
    }

    #[test]
    fn test_reconcile_keeps_valid_assignment() {
        let plan = RoutePlan {
            routes: vec![
                VehicleRoute {
                    vehicle_id: VehicleId::new(1),
                    visits: ids(&[1, 2]),
                },
                VehicleRoute {
                    vehicle_id: VehicleId::new(2),
                    visits: ids(&[3]),
                },
            ],
            unassigned: vec![],
        };

        let mut changed = problem(&[1, 2, 3], &[1, 2]);
        changed.apply(&FactChange::RemoveVisit {
            visit_id: VisitId::new(2),
        });
        changed.apply(&FactChange::AddVisit {
            visit: Visit::new(VisitId::new(4), Location::from_lat_lon(50.5, 4.0)),
        });

        let reconciled = plan.reconcile(&changed);

        assert_eq!(reconciled.routes[0].visits, ids(&[1]));
        assert_eq!(reconciled.routes[1].visits, ids(&[3]));
        assert_eq!(reconciled.unassigned, ids(&[4]));
    }

    #[test]
    fn test_reconcile_unassigns_visits_of_removed_vehicle() {
        let plan = RoutePlan {
            routes: vec![
                VehicleRoute {
                    vehicle_id: VehicleId::new(1),
                    visits: ids(&[1]),
                },
                VehicleRoute {
                    vehicle_id: VehicleId::new(2),
                    visits: ids(&[2, 3]),
                },
            ],
            unassigned: vec![],
        };

        let reconciled = plan.reconcile(&problem(&[1, 2, 3], &[1, 5]));

        assert_eq!(reconciled.routes.len(), 2);
        assert_eq!(reconciled.routes[0].visits, ids(&[1]));
        assert_eq!(reconciled.routes[1].vehicle_id, VehicleId::new(5));
        assert!(reconciled.routes[1].visits.is_empty());
        assert_eq!(reconciled.unassigned, ids(&[2, 3]));
        assert_eq!(reconciled.assigned_count(), 1);
    }

    #[test]
    fn test_unassigned_plan() {
        let plan = RoutePlan::unassigned(&problem(&[1, 2], &[1]));

        assert_eq!(plan.routes.len(), 1);
        assert_eq!(plan.assigned_count(), 0);
        assert_eq!(plan.unassigned, ids(&[1, 2]));
        assert_eq!(plan.non_empty_routes_iter().count(), 0);
    }
}
