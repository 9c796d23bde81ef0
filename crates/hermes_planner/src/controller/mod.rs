pub mod controller_handle;
pub mod controller_state;
pub mod publisher;
pub mod run_controller;
