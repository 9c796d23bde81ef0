use serde::{Deserialize, Serialize};

use crate::define_id_newtype;

use super::location::Location;

define_id_newtype!(VehicleId);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Vehicle {
    id: VehicleId,
    #[serde(default)]
    capacity: Option<u32>,
}

impl Vehicle {
    pub fn new(id: VehicleId) -> Self {
        Self {
            id,
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// `None` means the vehicle is not capacity constrained.
    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Depot {
    location: Location,
}

impl Depot {
    pub fn new(location: Location) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}
