use std::fmt;

use serde::Serialize;

use crate::{error::RunError, problem::fact_change::FactChange, solver::score::Score};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    /// No solvable problem, nothing running.
    NoProblem,
    /// A session was submitted and has not acknowledged its start yet.
    Seeding,
    Solving,
    /// The previous session is being stopped and replaced by a reseeded one.
    Restarting,
    /// Stopped on request. Stays here until reset.
    Stopped,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::NoProblem => "no_problem",
            ControllerState::Seeding => "seeding",
            ControllerState::Solving => "solving",
            ControllerState::Restarting => "restarting",
            ControllerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Snapshot of the run controller, published on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub state: ControllerState,
    /// Generation of the latest submitted session, 0 before the first one.
    pub generation: u64,
    pub best_score: Option<Score>,
    pub visits: usize,
    pub vehicles: usize,
    pub pending_changes: usize,
    pub last_error: Option<RunError>,
}

impl Default for ControllerStatus {
    fn default() -> Self {
        Self {
            state: ControllerState::NoProblem,
            generation: 0,
            best_score: None,
            visits: 0,
            vehicles: 0,
            pending_changes: 0,
            last_error: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ControllerState,
    pub to: ControllerState,
    pub generation: u64,
}

#[derive(Debug)]
pub(crate) enum Command {
    Apply(FactChange),
    Shutdown,
    Reset,
    Clear,
}
