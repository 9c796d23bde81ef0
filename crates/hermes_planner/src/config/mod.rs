pub mod properties;
pub mod resolver;
pub mod resource_loader;
pub mod solver_configuration;
