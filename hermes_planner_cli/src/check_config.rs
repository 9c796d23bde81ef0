use hermes_planner::config::{
    properties::PlannerProperties, resolver::ConfigurationResolver,
    resource_loader::ResourceLoader,
};

pub fn run(properties: PlannerProperties) -> Result<(), anyhow::Error> {
    let resolver = ConfigurationResolver::new(properties, ResourceLoader::new());
    let config = resolver.resolve()?;

    let summary = serde_json::json!({
        "source_kind": config.source_kind,
        "source_location": config.source_location,
        "name": config.name,
        "ruleset_location": config.ruleset_location,
        "constraint_weights": config.constraint_weights,
        "phases": config.phases,
        "termination_budget_secs": config.termination_budget.as_secs(),
        "search_path": resolver.loader().roots(),
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
