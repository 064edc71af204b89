//! Organization Models
//!
//! Tenants of the platform and their member lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::access::OrgRole;
use crate::utils::validation::{email_validator, name_validator, slug_validator};

/// Organization (tenant) record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Member row joined with the user's name and email
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrganizationMember {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: OrgRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: String,

    /// Derived from the name when absent
    #[validate(custom(function = "slug_validator"))]
    pub slug: Option<String>,

    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: Option<String>,

    #[validate(custom(function = "slug_validator"))]
    pub slug: Option<String>,

    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
}

/// Adds an existing account to an organization, or changes its role
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    pub role: OrgRole,
}
