pub mod best_solution_event;
pub mod score;
pub mod session;
pub mod solver;
pub mod stop_signal;
