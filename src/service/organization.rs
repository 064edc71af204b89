//! Organization Service
//!
//! Tenant lifecycle and membership management.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::database::Pagination;
use crate::models::{
    access::OrgRole,
    organization::{
        AddMemberRequest, CreateOrganizationRequest, Organization, OrganizationMember,
        UpdateOrganizationRequest,
    },
};
use crate::utils::{
    error::{AppError, AppResult},
    validation::{format_validation_errors, normalize_email, slugify, validate_slug},
};

const SLUG_TAKEN: &str = "Organization slug already exists";

#[derive(Clone)]
pub struct OrganizationService {
    pool: PgPool,
}

impl OrganizationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: CreateOrganizationRequest) -> AppResult<Organization> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        let slug = match request.slug {
            Some(slug) => slug,
            None => {
                let derived = slugify(&request.name);
                if !validate_slug(&derived) {
                    return Err(AppError::Validation(
                        "slug: Cannot derive a slug from this name; provide one".to_string(),
                    ));
                }
                derived
            }
        };

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.name.trim())
        .bind(&slug)
        .bind(request.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, SLUG_TAKEN))?;

        log::info!("Created organization {} ({})", organization.id, organization.slug);
        Ok(organization)
    }

    /// Platform administrators see every organization, everyone else their own
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        platform_admin: bool,
        pagination: Pagination,
    ) -> AppResult<Vec<Organization>> {
        let organizations = if platform_admin {
            sqlx::query_as::<_, Organization>(
                "SELECT * FROM organizations ORDER BY name LIMIT $1 OFFSET $2",
            )
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Organization>(
                r#"
                SELECT o.*
                FROM organizations o
                JOIN organization_members m ON m.organization_id = o.id
                WHERE m.user_id = $1
                ORDER BY o.name
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(user_id)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(organizations)
    }

    pub async fn get(&self, organization_id: Uuid) -> AppResult<Organization> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        request: UpdateOrganizationRequest,
    ) -> AppResult<Organization> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.slug)
        .bind(request.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, SLUG_TAKEN))?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
    }

    /// Removes the organization and everything it owns
    pub async fn delete(&self, organization_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(organization_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Organization not found".to_string()));
        }

        log::info!("Deleted organization {}", organization_id);
        Ok(())
    }

    pub async fn list_members(&self, organization_id: Uuid) -> AppResult<Vec<OrganizationMember>> {
        let members = sqlx::query_as::<_, OrganizationMember>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, m.role, m.created_at
            FROM organization_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY u.name
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Adds a member by email, or changes the role of an existing one
    pub async fn add_member(
        &self,
        organization_id: Uuid,
        request: AddMemberRequest,
    ) -> AppResult<OrganizationMember> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        let mut tx = self.pool.begin().await?;

        let user_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(normalize_email(&request.email))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if request.role == OrgRole::Member {
            ensure_not_last_admin(&mut tx, organization_id, user_id).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (organization_id, user_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(request.role.as_str())
        .execute(&mut *tx)
        .await?;

        let member = fetch_member(&mut tx, organization_id, user_id).await?;
        tx.commit().await?;

        log::info!(
            "User {} is now {} of organization {}",
            user_id,
            member.role,
            organization_id
        );
        Ok(member)
    }

    /// Removes a membership and the user's team-admin grants in this organization
    pub async fn remove_member(&self, organization_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        ensure_not_last_admin(&mut tx, organization_id, user_id).await?;

        let result = sqlx::query(
            "DELETE FROM organization_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }

        sqlx::query(
            r#"
            DELETE FROM team_admins
            WHERE user_id = $1
              AND team_id IN (SELECT id FROM teams WHERE organization_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Promotes a user to organization admin; used by `league-admin grant-org-admin`
    pub async fn grant_admin(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> AppResult<OrganizationMember> {
        self.add_member(
            organization_id,
            AddMemberRequest {
                email: email.to_string(),
                role: OrgRole::Admin,
            },
        )
        .await
    }

    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Organization> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
    }
}

/// Rejects removing or demoting the only admin of an organization
async fn ensure_not_last_admin(
    conn: &mut PgConnection,
    organization_id: Uuid,
    user_id: Uuid,
) -> AppResult<()> {
    let admins: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT user_id FROM organization_members
        WHERE organization_id = $1 AND role = 'admin'
        FOR UPDATE
        "#,
    )
    .bind(organization_id)
    .fetch_all(&mut *conn)
    .await?;

    if admins.len() == 1 && admins[0] == user_id {
        return Err(AppError::Conflict(
            "Cannot remove the last organization admin".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_member(
    conn: &mut PgConnection,
    organization_id: Uuid,
    user_id: Uuid,
) -> AppResult<OrganizationMember> {
    let member = sqlx::query_as::<_, OrganizationMember>(
        r#"
        SELECT u.id AS user_id, u.name, u.email, m.role, m.created_at
        FROM organization_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.organization_id = $1 AND m.user_id = $2
        "#,
    )
    .bind(organization_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(member)
}
