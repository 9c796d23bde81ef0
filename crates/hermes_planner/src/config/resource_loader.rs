use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::ConfigLoadError;

pub const DEFAULT_SOLVER_CONFIG: &str = "vehicle_routing_solver_config.json";
pub const DEFAULT_RULESET: &str = "rules/vehicle_routing_rules.json";

const EMBEDDED_RESOURCES: &[(&str, &str)] = &[
    (
        DEFAULT_SOLVER_CONFIG,
        include_str!("../../resources/solver/vehicle_routing_solver_config.json"),
    ),
    (
        DEFAULT_RULESET,
        include_str!("../../resources/solver/rules/vehicle_routing_rules.json"),
    ),
];

/// A loaded resource and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub location: String,
    pub contents: String,
}

/// Looks resources up in filesystem search roots, in the order they were
/// added, before falling back to the resources compiled into the binary.
///
/// Clones share the same search path. Roots can only be appended.
#[derive(Clone)]
pub struct ResourceLoader {
    roots: Arc<RwLock<Vec<PathBuf>>>,
    embedded: Arc<[(&'static str, &'static str)]>,
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::with_embedded(EMBEDDED_RESOURCES.to_vec())
    }
}

impl ResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedded(embedded: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            roots: Arc::new(RwLock::new(Vec::new())),
            embedded: embedded.into(),
        }
    }

    /// Appends a search root. Returns `false` when the root was already present.
    pub fn add_root(&self, root: impl AsRef<Path>) -> bool {
        let root = root.as_ref();
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        let mut roots = self.roots.write();
        if roots.contains(&root) {
            return false;
        }

        debug!(root = %root.display(), "Extending resource search path");
        roots.push(root);
        true
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.read().clone()
    }

    pub fn load(&self, name: &str) -> Result<Resource, ConfigLoadError> {
        if is_relative_resource_name(name) {
            for root in self.roots.read().iter() {
                let path = root.join(name);
                if !path.is_file() {
                    continue;
                }

                let contents = fs::read_to_string(&path)
                    .map_err(|source| ConfigLoadError::Unreadable { path: path.clone(), source })?;

                return Ok(Resource {
                    location: path.display().to_string(),
                    contents,
                });
            }
        }

        self.load_embedded(name)
    }

    pub fn load_embedded(&self, name: &str) -> Result<Resource, ConfigLoadError> {
        self.embedded
            .iter()
            .find(|(embedded_name, _)| *embedded_name == name)
            .map(|(embedded_name, contents)| Resource {
                location: format!("embedded:{embedded_name}"),
                contents: (*contents).to_owned(),
            })
            .ok_or_else(|| ConfigLoadError::MissingResource {
                name: name.to_owned(),
                searched: self.describe_search_path(),
            })
    }

    fn describe_search_path(&self) -> String {
        self.roots
            .read()
            .iter()
            .map(|root| root.display().to_string())
            .chain(std::iter::once(String::from("embedded")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Resource names stay inside their root.
fn is_relative_resource_name(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
