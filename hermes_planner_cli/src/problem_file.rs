use std::path::Path;

use hermes_planner::problem::{
    fact_change::FactChange, location::Location, vehicle::Vehicle, visit::Visit,
};
use serde::Deserialize;

/// Either a full problem or an explicit list of fact changes.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProblemFile {
    Changes(Vec<FactChange>),
    Problem {
        depot: Option<Location>,
        #[serde(default)]
        visits: Vec<Visit>,
        #[serde(default)]
        vehicles: Vec<Vehicle>,
    },
}

/// Reads a problem file as the fact changes to replay, in order.
///
/// A full problem is replayed vehicles first and depot last, so the controller
/// only starts solving once every fact is known.
pub fn read_fact_changes(path: &Path) -> Result<Vec<FactChange>, anyhow::Error> {
    let contents = std::fs::read_to_string(path)?;
    let file: ProblemFile = serde_json::from_str(&contents)?;

    Ok(match file {
        ProblemFile::Changes(changes) => changes,
        ProblemFile::Problem {
            depot,
            visits,
            vehicles,
        } => vehicles
            .into_iter()
            .map(|vehicle| FactChange::AddVehicle { vehicle })
            .chain(visits.into_iter().map(|visit| FactChange::AddVisit { visit }))
            .chain(depot.map(|location| FactChange::SetDepot { location }))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    fn write(contents: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(format!("hermes-planner-cli-{}.json", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_problem_is_replayed_depot_last() {
        let path = write(
            r#"{
                "depot": { "lat": 50.85, "lon": 4.35 },
                "visits": [{ "id": 1, "location": { "lat": 50.86, "lon": 4.36 } }],
                "vehicles": [{ "id": 1, "capacity": 10 }]
            }"#,
        );

        let changes = read_fact_changes(&path).unwrap();

        assert_eq!(changes.len(), 3);
        assert!(matches!(changes[0], FactChange::AddVehicle { .. }));
        assert!(matches!(changes[1], FactChange::AddVisit { .. }));
        assert!(matches!(changes[2], FactChange::SetDepot { .. }));
    }

    #[test]
    fn test_demo_problem_parses() {
        let path = env::current_dir().unwrap().join("data/brussels.json");
        let changes = read_fact_changes(&path).unwrap();

        assert!(matches!(changes.last(), Some(FactChange::SetDepot { .. })));
    }
}
