pub mod construction;
pub mod distance_matrix;
pub mod local_search_solver;
pub mod search_state;
pub mod two_opt;
