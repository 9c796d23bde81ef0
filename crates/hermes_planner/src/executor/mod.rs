pub mod execution_gate;
pub mod session_handle;
