//! Request and Response Models
//!
//! Account, authentication and shared request/response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::database::Pagination;
use crate::models::{access::OrgRole, auth::TokenPair, user::User};
use crate::utils::validation::{email_validator, name_validator, validate_password_strength};

/// Request payload for creating a new account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: String,

    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
}

/// Request payload for password login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Request payload for refreshing or revoking a refresh token
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token cannot be empty"))]
    pub refresh_token: String,
}

/// Response for signup and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// One organization the current user belongs to
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MembershipSummary {
    pub organization_id: Uuid,
    pub organization_name: String,
    #[sqlx(try_from = "String")]
    pub role: OrgRole,
}

/// One team the current user administers
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamAdminSummary {
    pub team_id: Uuid,
    pub team_name: String,
    pub organization_id: Uuid,
}

/// Response for `GET /auth/me`
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub memberships: Vec<MembershipSummary>,
    pub administered_teams: Vec<TeamAdminSummary>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Query parameters shared by paginated list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page, self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_request_validation() {
        let request = SignupRequest {
            name: "Dana Coach".to_string(),
            email: "dana@example.com".to_string(),
            password: "Coach2024".to_string(),
        };
        assert!(request.validate().is_ok());

        let weak = SignupRequest {
            password: "short".to_string(),
            ..request.clone()
        };
        assert!(weak.validate().is_err());

        let bad_email = SignupRequest {
            email: "dana".to_string(),
            ..request
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_login_request_requires_password() {
        let request = LoginRequest {
            email: "dana@example.com".to_string(),
            password: String::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_auth_response_flattens_tokens() {
        let response = AuthResponse {
            user: User {
                id: Uuid::new_v4(),
                name: "Dana".to_string(),
                email: "dana@example.com".to_string(),
                is_platform_admin: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            tokens: TokenPair::new("a".into(), "r".into(), 3600),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["access_token"], "a");
        assert_eq!(json["user"]["email"], "dana@example.com");
    }

    #[test]
    fn test_page_query_defaults() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.pagination().limit, 50);
    }
}
