//! Athlete Service

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::database::Pagination;
use crate::models::team::{Athlete, AthleteFilter, CreateAthleteRequest, UpdateAthleteRequest};
use crate::utils::{
    error::{AppError, AppResult},
    validation::{format_validation_errors, normalize_email},
};

#[derive(Clone)]
pub struct AthleteService {
    pool: PgPool,
}

impl AthleteService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists athletes, optionally narrowed to a team and a name search
    pub async fn list(&self, organization_id: Uuid, filter: &AthleteFilter) -> AppResult<Vec<Athlete>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM athletes WHERE organization_id = ");
        query.push_bind(organization_id);

        if let Some(team_id) = filter.team_id {
            query.push(" AND team_id = ").push_bind(team_id);
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            query
                .push(" AND (first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR (first_name || ' ' || last_name) ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query
            .push(" ORDER BY last_name, first_name LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);

        let athletes = query
            .build_query_as::<Athlete>()
            .fetch_all(&self.pool)
            .await?;

        Ok(athletes)
    }

    pub async fn get(&self, organization_id: Uuid, athlete_id: Uuid) -> AppResult<Athlete> {
        sqlx::query_as::<_, Athlete>("SELECT * FROM athletes WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(athlete_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Athlete not found".to_string()))
    }

    pub async fn create(&self, organization_id: Uuid, request: CreateAthleteRequest) -> AppResult<Athlete> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        if let Some(team_id) = request.team_id {
            self.ensure_team_in_organization(organization_id, team_id).await?;
        }

        let athlete = sqlx::query_as::<_, Athlete>(
            r#"
            INSERT INTO athletes (organization_id, team_id, first_name, last_name, birth_date, email, jersey_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(request.team_id)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(request.birth_date)
        .bind(request.email.as_deref().map(normalize_email))
        .bind(request.jersey_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(athlete)
    }

    /// Partial update; a team can be changed but not cleared
    pub async fn update(
        &self,
        organization_id: Uuid,
        athlete_id: Uuid,
        request: UpdateAthleteRequest,
    ) -> AppResult<Athlete> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        if let Some(team_id) = request.team_id {
            self.ensure_team_in_organization(organization_id, team_id).await?;
        }

        sqlx::query_as::<_, Athlete>(
            r#"
            UPDATE athletes
            SET
                team_id = COALESCE($3, team_id),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                birth_date = COALESCE($6, birth_date),
                email = COALESCE($7, email),
                jersey_number = COALESCE($8, jersey_number),
                updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(athlete_id)
        .bind(request.team_id)
        .bind(request.first_name.as_deref().map(str::trim))
        .bind(request.last_name.as_deref().map(str::trim))
        .bind(request.birth_date)
        .bind(request.email.as_deref().map(normalize_email))
        .bind(request.jersey_number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Athlete not found".to_string()))
    }

    pub async fn delete(&self, organization_id: Uuid, athlete_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM athletes WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(athlete_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Athlete not found".to_string()));
        }
        Ok(())
    }

    async fn ensure_team_in_organization(&self, organization_id: Uuid, team_id: Uuid) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM teams WHERE id = $1 AND organization_id = $2)",
        )
        .bind(team_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::Validation(
                "team_id: Team does not belong to this organization".to_string(),
            ))
        }
    }
}

/// Escapes LIKE wildcards in user input
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ana"), "ana");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    async fn seed(pool: &PgPool) -> (Uuid, Uuid) {
        let org: Uuid = sqlx::query_scalar(
            "INSERT INTO organizations (name, slug) VALUES ('Club', 'club') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let team: Uuid = sqlx::query_scalar(
            "INSERT INTO teams (organization_id, name) VALUES ($1, 'U17') RETURNING id",
        )
        .bind(org)
        .fetch_one(pool)
        .await
        .unwrap();
        (org, team)
    }

    fn athlete(first: &str, last: &str, team_id: Option<Uuid>) -> CreateAthleteRequest {
        CreateAthleteRequest {
            team_id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            birth_date: None,
            email: None,
            jersey_number: None,
        }
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_list_filters(pool: PgPool) {
        let (org, team) = seed(&pool).await;
        let service = AthleteService::new(pool);

        service.create(org, athlete("Ana", "Silva", Some(team))).await.unwrap();
        service.create(org, athlete("Bruno", "Costa", None)).await.unwrap();

        let all = service.list(org, &AthleteFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_team = AthleteFilter {
            team_id: Some(team),
            ..Default::default()
        };
        assert_eq!(service.list(org, &by_team).await.unwrap().len(), 1);

        let search = AthleteFilter {
            search: Some("ana sil".to_string()),
            ..Default::default()
        };
        let found = service.list(org, &search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].last_name, "Silva");
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_team_must_belong_to_organization(pool: PgPool) {
        let (_, foreign_team) = seed(&pool).await;
        let other: Uuid = sqlx::query_scalar(
            "INSERT INTO organizations (name, slug) VALUES ('Other', 'other') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let service = AthleteService::new(pool);
        let result = service.create(other, athlete("Ana", "Silva", Some(foreign_team))).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
