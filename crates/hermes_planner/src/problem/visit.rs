use serde::{Deserialize, Serialize};

use crate::define_id_newtype;

use super::location::Location;

define_id_newtype!(VisitId);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Visit {
    id: VisitId,
    location: Location,
    #[serde(default = "default_demand")]
    demand: u32,
}

fn default_demand() -> u32 {
    1
}

impl Visit {
    pub fn new(id: VisitId, location: Location) -> Self {
        Self {
            id,
            location,
            demand: default_demand(),
        }
    }

    pub fn with_demand(mut self, demand: u32) -> Self {
        self.demand = demand;
        self
    }

    pub fn id(&self) -> VisitId {
        self.id
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn demand(&self) -> u32 {
        self.demand
    }
}
