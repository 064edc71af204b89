//! API Layer
//!
//! HTTP endpoints for accounts, organizations and their sports data, and the
//! AI import pipeline.

pub mod auth_handlers;
pub mod competition_handlers;
pub mod handlers;
pub mod import_handlers;
pub mod middleware;
pub mod organization_handlers;
pub mod routes;
pub mod team_handlers;

// Re-export commonly used types
pub use handlers::{AppState, SuccessResponse};
pub use middleware::{auth_middleware, security_headers, AuthUser};
pub use routes::{create_minimal_routes, create_readonly_routes, create_routes, RouterBuilder};
