//! Service Layer
//!
//! Business logic and data access for accounts, organizations and their
//! sports data, plus the AI import pipeline.

pub mod access;
pub mod athlete;
pub mod competition;
pub mod extraction;
pub mod import_reconciler;
pub mod import_service;
pub mod import_webhook;
pub mod jwt;
pub mod location;
pub mod organization;
pub mod roster;
pub mod team;
pub mod user;
pub mod vision;

// Re-export services
pub use access::AccessService;
pub use athlete::AthleteService;
pub use competition::CompetitionService;
pub use import_service::{ImportError, ImportService, UploadedFile};
pub use jwt::JwtService;
pub use location::LocationService;
pub use organization::OrganizationService;
pub use roster::RosterService;
pub use team::TeamService;
pub use user::{UserService, UserServiceError};
