//! HTTP Request Handlers
//!
//! Shared application state, the success envelope and the health check.
//! Resource handlers live in the per-feature modules next to this one.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    api::middleware::AuthUser,
    config::AppConfig,
    models::{
        access::{Action, Principal},
        requests::HealthCheckResponse,
    },
    service::{
        AccessService, AthleteService, CompetitionService, ImportError, ImportService,
        JwtService, LocationService, OrganizationService, RosterService, TeamService,
        UserService,
    },
    utils::error::AppResult,
    VERSION,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub jwt_service: Arc<JwtService>,
    pub access_service: Arc<AccessService>,
    pub organization_service: Arc<OrganizationService>,
    pub team_service: Arc<TeamService>,
    pub athlete_service: Arc<AthleteService>,
    pub location_service: Arc<LocationService>,
    pub competition_service: Arc<CompetitionService>,
    pub roster_service: Arc<RosterService>,
    pub import_service: Arc<ImportService>,
}

impl AppState {
    /// Builds every service over one pool
    pub fn new(pool: PgPool, config: &AppConfig) -> Result<Self, ImportError> {
        let import_service =
            ImportService::new(pool.clone(), config.import.clone(), config.vision.clone())?;

        Ok(Self {
            user_service: Arc::new(UserService::new(pool.clone())),
            jwt_service: Arc::new(JwtService::from_config(pool.clone(), &config.jwt)),
            access_service: Arc::new(AccessService::new(pool.clone())),
            organization_service: Arc::new(OrganizationService::new(pool.clone())),
            team_service: Arc::new(TeamService::new(pool.clone())),
            athlete_service: Arc::new(AthleteService::new(pool.clone())),
            location_service: Arc::new(LocationService::new(pool.clone())),
            competition_service: Arc::new(CompetitionService::new(pool.clone())),
            roster_service: Arc::new(RosterService::new(pool)),
            import_service: Arc::new(import_service),
        })
    }

    /// Loads the caller's standing in `organization_id` and checks `action` against it
    pub async fn authorize(
        &self,
        auth_user: &AuthUser,
        organization_id: Uuid,
        action: Action,
    ) -> AppResult<Principal> {
        let principal = self
            .access_service
            .load_principal(auth_user.0.user_id, organization_id)
            .await?;
        principal.authorize(action)?;
        Ok(principal)
    }
}

/// Standard success response wrapper
#[derive(serde::Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Shorthand for the JSON success envelope
pub type ApiResponse<T> = Json<SuccessResponse<T>>;

pub fn respond<T>(data: T) -> ApiResponse<T> {
    Json(SuccessResponse::new(data))
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<AppState>,
) -> AppResult<ApiResponse<HealthCheckResponse>> {
    state.user_service.health_check().await?;

    let response = HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: VERSION.to_string(),
    };

    Ok(respond(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_creation() {
        let response = SuccessResponse::new("test data");
        assert!(response.success);
        assert_eq!(response.data, "test data");
    }

    #[test]
    fn test_success_envelope_shape() {
        let Json(body) = respond(vec![1, 2]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "success": true, "data": [1, 2] })
        );
    }
}
