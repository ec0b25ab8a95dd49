pub mod agreements;
pub mod assignments;
pub mod auth;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod properties;
pub mod rest;
pub mod router;
pub mod state;

// Re-export the router builder and shared state to make them easily accessible
// to the binary that serves the application.
pub use middleware::require_auth;
pub use router::build_router;
pub use state::AppState;
