//! Team Service
//!
//! Teams inside an organization and the users who administer them.

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::database::Pagination;
use crate::models::team::{AddTeamAdminRequest, CreateTeamRequest, Team, TeamAdmin, UpdateTeamRequest};
use crate::utils::{
    error::{AppError, AppResult},
    validation::{format_validation_errors, normalize_email},
};

const NAME_TAKEN: &str = "A team with this name already exists";

#[derive(Clone)]
pub struct TeamService {
    pool: PgPool,
}

impl TeamService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, organization_id: Uuid, pagination: Pagination) -> AppResult<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT * FROM teams
            WHERE organization_id = $1
            ORDER BY name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(organization_id)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(teams)
    }

    pub async fn get(&self, organization_id: Uuid, team_id: Uuid) -> AppResult<Team> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Team not found".to_string()))
    }

    pub async fn create(&self, organization_id: Uuid, request: CreateTeamRequest) -> AppResult<Team> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (organization_id, name, sport)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(request.name.trim())
        .bind(request.sport)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, NAME_TAKEN))
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        team_id: Uuid,
        request: UpdateTeamRequest,
    ) -> AppResult<Team> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET name = COALESCE($3, name), sport = COALESCE($4, sport), updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(team_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.sport)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, NAME_TAKEN))?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))
    }

    /// Deletes a team; its athletes stay in the organization without a team
    pub async fn delete(&self, organization_id: Uuid, team_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM teams WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(team_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Team not found".to_string()));
        }
        Ok(())
    }

    pub async fn list_admins(&self, organization_id: Uuid, team_id: Uuid) -> AppResult<Vec<TeamAdmin>> {
        self.get(organization_id, team_id).await?;

        let admins = sqlx::query_as::<_, TeamAdmin>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, ta.created_at
            FROM team_admins ta
            JOIN users u ON u.id = ta.user_id
            WHERE ta.team_id = $1
            ORDER BY u.name
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(admins)
    }

    /// Grants team admin by email, making the user an organization member if needed
    pub async fn add_admin(
        &self,
        organization_id: Uuid,
        team_id: Uuid,
        request: AddTeamAdminRequest,
    ) -> AppResult<TeamAdmin> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;
        self.get(organization_id, team_id).await?;

        let mut tx = self.pool.begin().await?;

        let user_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(normalize_email(&request.email))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role)
            VALUES ($1, $2, 'member')
            ON CONFLICT (organization_id, user_id) DO NOTHING
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO team_admins (team_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (team_id, user_id) DO NOTHING
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let admin = sqlx::query_as::<_, TeamAdmin>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, ta.created_at
            FROM team_admins ta
            JOIN users u ON u.id = ta.user_id
            WHERE ta.team_id = $1 AND ta.user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!("User {} now administers team {}", user_id, team_id);
        Ok(admin)
    }

    /// Revokes team admin; organization membership is kept
    pub async fn remove_admin(&self, organization_id: Uuid, team_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.get(organization_id, team_id).await?;

        let result = sqlx::query("DELETE FROM team_admins WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Team admin not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::access::OrgRole;

    async fn seed_org(pool: &PgPool) -> Uuid {
        sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ('Club', 'club') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn team(name: &str) -> CreateTeamRequest {
        CreateTeamRequest {
            name: name.to_string(),
            sport: Some("Athletics".to_string()),
        }
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_team_names_unique_case_insensitive(pool: PgPool) {
        let org = seed_org(&pool).await;
        let service = TeamService::new(pool);

        service.create(org, team("U17 Girls")).await.unwrap();
        assert!(matches!(
            service.create(org, team("u17 girls")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_add_admin_ensures_membership(pool: PgPool) {
        let org = seed_org(&pool).await;
        let user: Uuid = sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash) VALUES ('Coach', 'coach@example.com', 'x') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let service = TeamService::new(pool.clone());
        let created = service.create(org, team("Seniors")).await.unwrap();

        let admin = service
            .add_admin(
                org,
                created.id,
                AddTeamAdminRequest {
                    email: "Coach@Example.com".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(admin.user_id, user);

        let role: String = sqlx::query_scalar(
            "SELECT role FROM organization_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(org)
        .bind(user)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(role, OrgRole::Member.as_str());

        service.remove_admin(org, created.id, user).await.unwrap();
        assert!(service.list_admins(org, created.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_team_scoped_to_organization(pool: PgPool) {
        let org = seed_org(&pool).await;
        let service = TeamService::new(pool);
        let created = service.create(org, team("Juniors")).await.unwrap();

        assert!(matches!(
            service.get(Uuid::new_v4(), created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
