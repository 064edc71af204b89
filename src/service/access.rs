//! Access Service
//!
//! Loads the role rows that decide what a user may do inside one organization.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::access::{OrgRole, Principal};
use crate::utils::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AccessService {
    pool: PgPool,
}

impl AccessService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the caller's principal for `organization_id`
    ///
    /// Unknown organizations are reported as `NotFound` regardless of role.
    pub async fn load_principal(&self, user_id: Uuid, organization_id: Uuid) -> AppResult<Principal> {
        let row: Option<(bool, Option<String>)> = sqlx::query_as(
            r#"
            SELECT u.is_platform_admin, m.role
            FROM organizations o
            CROSS JOIN users u
            LEFT JOIN organization_members m
                ON m.organization_id = o.id AND m.user_id = u.id
            WHERE o.id = $1 AND u.id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let (platform_admin, role) =
            row.ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

        let org_role = role
            .map(OrgRole::try_from)
            .transpose()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let admin_team_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT ta.team_id
            FROM team_admins ta
            JOIN teams t ON t.id = ta.team_id
            WHERE ta.user_id = $1 AND t.organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Principal {
            user_id,
            organization_id,
            platform_admin,
            org_role,
            admin_team_ids,
        })
    }

    pub async fn is_platform_admin(&self, user_id: Uuid) -> AppResult<bool> {
        let flag: Option<bool> =
            sqlx::query_scalar("SELECT is_platform_admin FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(flag.unwrap_or(false))
    }

    /// Fails with `Forbidden` unless the user is a platform administrator
    pub async fn require_platform_admin(&self, user_id: Uuid) -> AppResult<()> {
        if self.is_platform_admin(user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Platform administrator role required".to_string(),
            ))
        }
    }
}
