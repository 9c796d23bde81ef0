use geo::{Distance, Haversine};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Location {
    lat: f64,
    lon: f64,
}

impl Location {
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    fn point(&self) -> geo::Point {
        geo::Point::new(self.lon, self.lat)
    }

    /// Great-circle distance in meters.
    pub fn haversine_distance(&self, to: &Location) -> f64 {
        Haversine.distance(self.point(), to.point())
    }
}
