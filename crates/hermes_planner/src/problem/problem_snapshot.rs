use serde::{Deserialize, Serialize};

use super::{
    fact_change::FactChange,
    vehicle::{Depot, Vehicle, VehicleId},
    visit::{Visit, VisitId},
};

/// The current set of facts the optimizer works on.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProblemSnapshot {
    depot: Option<Depot>,
    visits: Vec<Visit>,
    vehicles: Vec<Vehicle>,
}

impl ProblemSnapshot {
    pub fn new(depot: Option<Depot>, visits: Vec<Visit>, vehicles: Vec<Vehicle>) -> Self {
        let mut snapshot = Self {
            depot,
            ..Self::default()
        };

        for visit in visits {
            snapshot.apply(&FactChange::AddVisit { visit });
        }
        for vehicle in vehicles {
            snapshot.apply(&FactChange::AddVehicle { vehicle });
        }

        snapshot
    }

    pub fn depot(&self) -> Option<&Depot> {
        self.depot.as_ref()
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn visit(&self, visit_id: VisitId) -> Option<&Visit> {
        self.visits.iter().find(|visit| visit.id() == visit_id)
    }

    pub fn vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles
            .iter()
            .find(|vehicle| vehicle.id() == vehicle_id)
    }

    /// A depot and at least one visit are required before anything can be routed.
    pub fn is_solvable(&self) -> bool {
        self.depot.is_some() && !self.visits.is_empty()
    }

    /// Applies the change and returns whether the facts actually changed.
    pub fn apply(&mut self, change: &FactChange) -> bool {
        match change {
            FactChange::AddVisit { visit } => {
                match self.visits.iter_mut().find(|v| v.id() == visit.id()) {
                    Some(existing) if existing == visit => false,
                    Some(existing) => {
                        *existing = visit.clone();
                        true
                    }
                    None => {
                        self.visits.push(visit.clone());
                        true
                    }
                }
            }
            FactChange::RemoveVisit { visit_id } => {
                let before = self.visits.len();
                self.visits.retain(|visit| visit.id() != *visit_id);
                self.visits.len() != before
            }
            FactChange::AddVehicle { vehicle } => {
                match self.vehicles.iter_mut().find(|v| v.id() == vehicle.id()) {
                    Some(existing) if existing == vehicle => false,
                    Some(existing) => {
                        *existing = vehicle.clone();
                        true
                    }
                    None => {
                        self.vehicles.push(vehicle.clone());
                        true
                    }
                }
            }
            FactChange::RemoveVehicle { vehicle_id } => {
                let before = self.vehicles.len();
                self.vehicles.retain(|vehicle| vehicle.id() != *vehicle_id);
                self.vehicles.len() != before
            }
            FactChange::SetDepot { location } => {
                let depot = Depot::new(*location);
                if self.depot == Some(depot) {
                    false
                } else {
                    self.depot = Some(depot);
                    true
                }
            }
            FactChange::ClearDepot => self.depot.take().is_some(),
        }
    }
}
