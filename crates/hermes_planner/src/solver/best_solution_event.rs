use std::sync::Arc;

use jiff::Timestamp;
use serde::Serialize;

use crate::problem::route_plan::RoutePlan;

use super::score::Score;

/// Immutable snapshot of an improving solution, as delivered to publishers.
#[derive(Debug, Clone, Serialize)]
pub struct BestSolutionEvent {
    pub generation: u64,
    pub timestamp: Timestamp,
    pub score: Score,
    pub route_plan: Arc<RoutePlan>,
}

impl BestSolutionEvent {
    pub fn new(generation: u64, score: Score, route_plan: RoutePlan) -> Self {
        Self {
            generation,
            timestamp: Timestamp::now(),
            score,
            route_plan: Arc::new(route_plan),
        }
    }
}
