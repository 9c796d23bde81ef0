use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    Embedded,
    UserOverride,
}

/// On-disk solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfigDocument {
    #[serde(default)]
    pub name: Option<String>,
    /// Resource name of the constraint weights, resolved through the search path.
    pub ruleset: String,
    #[serde(default)]
    pub termination: TerminationDocument,
    #[serde(default = "default_phases")]
    pub phases: Vec<PhaseConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminationDocument {
    #[serde(default)]
    pub seconds_spent_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhaseConfig {
    ConstructionHeuristic,
    LocalSearch {
        #[serde(default)]
        move_limit: Option<usize>,
    },
}

fn default_phases() -> Vec<PhaseConfig> {
    vec![
        PhaseConfig::ConstructionHeuristic,
        PhaseConfig::LocalSearch { move_limit: None },
    ]
}

/// Constraint weights of the ruleset. Hard weights apply to unassigned
/// visits and capacity overload, soft weights to distance and used vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintWeights {
    pub unassigned_visit: f64,
    pub capacity_overload: f64,
    pub distance_per_meter: f64,
    #[serde(default)]
    pub vehicle_used: f64,
}

impl Default for ConstraintWeights {
    fn default() -> Self {
        Self {
            unassigned_visit: 1.0,
            capacity_overload: 1.0,
            distance_per_meter: 1.0,
            vehicle_used: 0.0,
        }
    }
}

/// A fully resolved configuration, loaded from exactly one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfiguration {
    pub source_kind: SourceKind,
    pub source_location: String,
    pub name: String,
    pub ruleset_location: String,
    pub constraint_weights: ConstraintWeights,
    pub phases: Vec<PhaseConfig>,
    /// Whole seconds.
    pub termination_budget: Duration,
}

impl SolverConfiguration {
    pub fn is_user_override(&self) -> bool {
        self.source_kind == SourceKind::UserOverride
    }
}
