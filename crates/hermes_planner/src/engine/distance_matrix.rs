use crate::problem::location::Location;

/// Symmetric haversine distances between a fixed set of locations.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    size: usize,
    distances: Vec<f64>,
}

impl DistanceMatrix {
    pub fn from_locations(locations: &[Location]) -> Self {
        let size = locations.len();
        let mut distances = vec![0.0; size * size];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate().skip(i + 1) {
                let distance = from.haversine_distance(to);
                distances[i * size + j] = distance;
                distances[j * size + i] = distance;
            }
        }

        Self { size, distances }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from * self.size + to]
    }
}
