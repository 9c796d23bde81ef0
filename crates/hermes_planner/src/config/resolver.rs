use std::{fs, path::Path, time::Duration};

use tracing::{debug, info};

use crate::error::ConfigLoadError;

use super::{
    properties::PlannerProperties,
    resource_loader::{DEFAULT_SOLVER_CONFIG, Resource, ResourceLoader},
    solver_configuration::{ConstraintWeights, SolverConfigDocument, SolverConfiguration, SourceKind},
};

pub const DEFAULT_TERMINATION_BUDGET: Duration = Duration::from_secs(30);

/// Decides which solver configuration is in effect.
///
/// A user supplied directory wins over the embedded default. The directory is
/// checked again on every call, so an override added later is picked up by
/// the next session that gets built.
#[derive(Clone)]
pub struct ConfigurationResolver {
    properties: PlannerProperties,
    loader: ResourceLoader,
}

impl ConfigurationResolver {
    pub fn new(properties: PlannerProperties, loader: ResourceLoader) -> Self {
        Self { properties, loader }
    }

    pub fn properties(&self) -> &PlannerProperties {
        &self.properties
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    pub fn resolve(&self) -> Result<SolverConfiguration, ConfigLoadError> {
        self.resolve_from(
            &self.properties.solver_config_dir,
            &self.properties.solver_config_file,
        )
    }

    pub fn resolve_from(
        &self,
        override_dir: &Path,
        file_name: &str,
    ) -> Result<SolverConfiguration, ConfigLoadError> {
        let (source_kind, resource) = if override_exists(override_dir) {
            info!("Loading solver configuration from {}", override_dir.display());

            if self.loader.add_root(override_dir) {
                debug!("Added {} to the resource search path", override_dir.display());
            }

            let path = override_dir.join(file_name);
            let contents = fs::read_to_string(&path).map_err(|source| {
                ConfigLoadError::Unreadable {
                    path: path.clone(),
                    source,
                }
            })?;

            (
                SourceKind::UserOverride,
                Resource {
                    location: path.display().to_string(),
                    contents,
                },
            )
        } else {
            info!(
                "No user defined solver configuration exists at {}. Using default",
                override_dir.display()
            );

            (
                SourceKind::Embedded,
                self.loader.load_embedded(DEFAULT_SOLVER_CONFIG)?,
            )
        };

        let document: SolverConfigDocument = parse(&resource)?;
        let ruleset = self.loader.load(&document.ruleset)?;
        let constraint_weights: ConstraintWeights = parse(&ruleset)?;

        let termination_budget = self.termination_budget(&document);

        debug!(
            source = %resource.location,
            ruleset = %ruleset.location,
            budget_secs = termination_budget.as_secs(),
            "Resolved solver configuration"
        );

        Ok(SolverConfiguration {
            source_kind,
            source_location: resource.location,
            name: document
                .name
                .unwrap_or_else(|| String::from("vehicle-routing")),
            ruleset_location: ruleset.location,
            constraint_weights,
            phases: document.phases,
            termination_budget,
        })
    }

    /// The configured timeout wins over the document's own limit, truncated
    /// to whole seconds.
    fn termination_budget(&self, document: &SolverConfigDocument) -> Duration {
        let timeout_secs = self.properties.optimizer_timeout.unsigned_abs().as_secs();
        if timeout_secs > 0 {
            return Duration::from_secs(timeout_secs);
        }

        document
            .termination
            .seconds_spent_limit
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TERMINATION_BUDGET)
    }
}

fn parse<T: serde::de::DeserializeOwned>(resource: &Resource) -> Result<T, ConfigLoadError> {
    serde_json::from_str(&resource.contents).map_err(|source| ConfigLoadError::Malformed {
        location: resource.location.clone(),
        source,
    })
}

/// Only a real directory counts. Symbolic links are not followed, so a link
/// (dangling or not) or a plain file falls back to the embedded default.
fn override_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|metadata| metadata.is_dir())
}
