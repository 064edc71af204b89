//! Data Models Module
//!
//! Entities, request/response payloads and the access-control types shared
//! by the service and API layers.

pub mod access;
pub mod auth;
pub mod competition;
pub mod import;
pub mod organization;
pub mod requests;
pub mod team;
pub mod user;

// Re-export commonly used types
pub use access::{Action, OrgRole, Principal, Role};
pub use auth::*;
pub use competition::*;
pub use import::*;
pub use organization::*;
pub use requests::*;
pub use team::*;
pub use user::*;
