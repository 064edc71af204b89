//! League Service Library
//!
//! A multi-tenant sports-organization management API: organizations, teams,
//! athletes, locations, seasons, competitions, events and rosters, guarded by a
//! four-role permission model, plus an AI-assisted import that turns photos of
//! competition schedules into structured data.
//!
//! # Features
//!
//! - **Multi-Tenant Data**: every resource is scoped to an organization
//! - **Role-Based Access**: platform admin, organization admin, team admin and member
//! - **JWT Sessions**: short-lived access tokens, revocable refresh sessions
//! - **AI Import**: vision-model extraction in-request, or via a signed webhook round trip
//! - **Idempotent Reconciliation**: imports upsert seasons, locations, competitions
//!   and events in one transaction, so replays never duplicate data
//! - **Flexible Router**: route groups enabled via the RouterBuilder pattern
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use league_service::{
//!     api::{AppState, RouterBuilder},
//!     config::AppConfig,
//!     database::DatabaseConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let pool = DatabaseConfig::from(&config.database).create_pool().await?;
//!     league_service::database::run_migrations(&pool).await?;
//!
//!     let state = AppState::new(pool, &config)?;
//!     let app = RouterBuilder::with_all_routes()
//!         .with_auth(state.jwt_service.clone())
//!         .build()
//!         .with_state(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Router Builder Examples
//!
//! ```rust,no_run
//! use league_service::api::RouterBuilder;
//!
//! // Public schedule viewer: sign-in plus GET routes
//! let viewer = RouterBuilder::with_readonly_routes();
//!
//! // Roster management only
//! let rosters = RouterBuilder::new()
//!     .health_check(true)
//!     .auth(true)
//!     .rosters(true)
//!     .writes(true);
//! ```
//!
//! # Architecture
//!
//! - **API Layer**: handlers, bearer-token middleware and configurable routes
//! - **Service Layer**: business rules, authorization lookups and the import pipeline
//! - **Models**: entities, request payloads and the permission matrix
//! - **Database**: pool setup, embedded migrations and pagination
//! - **Utils**: errors, validation and security helpers

/// HTTP API layer with handlers and configurable routing
pub mod api;

/// Configuration management for all service settings
pub mod config;

/// Database connection management and migrations
pub mod database;

/// Data models and request/response structures
pub mod models;

/// Business logic and data access services
pub mod service;

/// Shared utilities for security, validation, and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{create_routes, AppState, RouterBuilder};
pub use models::{
    access::{Action, OrgRole, Principal, Role},
    auth::{TokenPair, UserContext},
    import::{ExtractedImport, ImportJob, ImportMode, ImportStatus, ImportSummary},
    user::User,
};
pub use service::{
    AccessService, AthleteService, CompetitionService, ImportError, ImportService, JwtService,
    LocationService, OrganizationService, RosterService, TeamService, UserService,
};
pub use utils::error::{AppError, AppResult, ErrorResponse};

// Re-export database utilities for configuration
pub use database::{DatabaseConfig, DatabasePool};

// Re-export configuration system
pub use config::{env, AppConfig, ImportConfig, JwtConfig, ServerConfig, VisionConfig};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
