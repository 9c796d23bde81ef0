pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod executor;
pub mod problem;
pub mod solver;
mod utils;
