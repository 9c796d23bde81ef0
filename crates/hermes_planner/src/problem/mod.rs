pub mod fact_change;
pub mod location;
pub mod problem_snapshot;
pub mod route_plan;
pub mod vehicle;
pub mod visit;
