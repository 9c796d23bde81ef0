use serde::{Deserialize, Serialize};

use super::{
    location::Location,
    vehicle::{Vehicle, VehicleId},
    visit::{Visit, VisitId},
};

/// A single discrete change to the problem facts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FactChange {
    AddVisit { visit: Visit },
    RemoveVisit { visit_id: VisitId },
    AddVehicle { vehicle: Vehicle },
    RemoveVehicle { vehicle_id: VehicleId },
    SetDepot { location: Location },
    ClearDepot,
}

impl std::fmt::Display for FactChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactChange::AddVisit { visit } => write!(f, "add visit {}", visit.id()),
            FactChange::RemoveVisit { visit_id } => write!(f, "remove visit {visit_id}"),
            FactChange::AddVehicle { vehicle } => write!(f, "add vehicle {}", vehicle.id()),
            FactChange::RemoveVehicle { vehicle_id } => write!(f, "remove vehicle {vehicle_id}"),
            FactChange::SetDepot { .. } => write!(f, "set depot"),
            FactChange::ClearDepot => write!(f, "clear depot"),
        }
    }
}
