//! Competition Service
//!
//! Seasons, competitions and the events scheduled inside a competition.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::database::Pagination;
use crate::models::competition::{
    Competition, CompetitionEvent, CompetitionFilter, CompetitionRequest, EventRequest, Season,
    SeasonRequest,
};
use crate::utils::{
    error::{AppError, AppResult},
    validation::format_validation_errors,
};

const SEASON_TAKEN: &str = "A season with this name already exists";

#[derive(Clone)]
pub struct CompetitionService {
    pool: PgPool,
}

impl CompetitionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Seasons

    pub async fn list_seasons(&self, organization_id: Uuid) -> AppResult<Vec<Season>> {
        let seasons = sqlx::query_as::<_, Season>(
            r#"
            SELECT * FROM seasons
            WHERE organization_id = $1
            ORDER BY starts_on DESC NULLS LAST, name
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(seasons)
    }

    pub async fn get_season(&self, organization_id: Uuid, season_id: Uuid) -> AppResult<Season> {
        sqlx::query_as::<_, Season>("SELECT * FROM seasons WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(season_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Season not found".to_string()))
    }

    pub async fn create_season(&self, organization_id: Uuid, request: SeasonRequest) -> AppResult<Season> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        sqlx::query_as::<_, Season>(
            r#"
            INSERT INTO seasons (organization_id, name, starts_on, ends_on)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(request.name.trim())
        .bind(request.starts_on)
        .bind(request.ends_on)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, SEASON_TAKEN))
    }

    /// Replaces name and dates
    pub async fn update_season(
        &self,
        organization_id: Uuid,
        season_id: Uuid,
        request: SeasonRequest,
    ) -> AppResult<Season> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        sqlx::query_as::<_, Season>(
            r#"
            UPDATE seasons
            SET name = $3, starts_on = $4, ends_on = $5, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(season_id)
        .bind(request.name.trim())
        .bind(request.starts_on)
        .bind(request.ends_on)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, SEASON_TAKEN))?
        .ok_or_else(|| AppError::NotFound("Season not found".to_string()))
    }

    pub async fn delete_season(&self, organization_id: Uuid, season_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM seasons WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(season_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Season not found".to_string()));
        }
        Ok(())
    }

    // Competitions

    pub async fn list_competitions(
        &self,
        organization_id: Uuid,
        filter: &CompetitionFilter,
    ) -> AppResult<Vec<Competition>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM competitions WHERE organization_id = ");
        query.push_bind(organization_id);

        if let Some(season_id) = filter.season_id {
            query.push(" AND season_id = ").push_bind(season_id);
        }
        // window overlap: competitions without dates never match a window
        if let Some(from) = filter.from {
            query
                .push(" AND COALESCE(ends_on, starts_on) >= ")
                .push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND starts_on <= ").push_bind(to);
        }

        query
            .push(" ORDER BY starts_on NULLS LAST, name LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);

        let competitions = query
            .build_query_as::<Competition>()
            .fetch_all(&self.pool)
            .await?;

        Ok(competitions)
    }

    pub async fn get_competition(
        &self,
        organization_id: Uuid,
        competition_id: Uuid,
    ) -> AppResult<Competition> {
        sqlx::query_as::<_, Competition>(
            "SELECT * FROM competitions WHERE organization_id = $1 AND id = $2",
        )
        .bind(organization_id)
        .bind(competition_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".to_string()))
    }

    pub async fn create_competition(
        &self,
        organization_id: Uuid,
        request: CompetitionRequest,
    ) -> AppResult<Competition> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;
        self.check_references(organization_id, request.season_id, request.location_id)
            .await?;

        let competition = sqlx::query_as::<_, Competition>(
            r#"
            INSERT INTO competitions (organization_id, season_id, location_id, name, starts_on, ends_on, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(request.season_id)
        .bind(request.location_id)
        .bind(request.name.trim())
        .bind(request.starts_on)
        .bind(request.ends_on)
        .bind(request.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(competition)
    }

    /// Replaces every editable field
    pub async fn update_competition(
        &self,
        organization_id: Uuid,
        competition_id: Uuid,
        request: CompetitionRequest,
    ) -> AppResult<Competition> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;
        self.check_references(organization_id, request.season_id, request.location_id)
            .await?;

        sqlx::query_as::<_, Competition>(
            r#"
            UPDATE competitions
            SET
                season_id = $3,
                location_id = $4,
                name = $5,
                starts_on = $6,
                ends_on = $7,
                description = $8,
                updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(competition_id)
        .bind(request.season_id)
        .bind(request.location_id)
        .bind(request.name.trim())
        .bind(request.starts_on)
        .bind(request.ends_on)
        .bind(request.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".to_string()))
    }

    pub async fn delete_competition(&self, organization_id: Uuid, competition_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM competitions WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(competition_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Competition not found".to_string()));
        }
        Ok(())
    }

    // Events

    pub async fn list_events(
        &self,
        organization_id: Uuid,
        competition_id: Uuid,
    ) -> AppResult<Vec<CompetitionEvent>> {
        self.get_competition(organization_id, competition_id).await?;

        let events = sqlx::query_as::<_, CompetitionEvent>(
            r#"
            SELECT * FROM competition_events
            WHERE competition_id = $1
            ORDER BY starts_at NULLS LAST, name
            "#,
        )
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    pub async fn create_event(
        &self,
        organization_id: Uuid,
        competition_id: Uuid,
        request: EventRequest,
    ) -> AppResult<CompetitionEvent> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;
        self.get_competition(organization_id, competition_id).await?;
        self.check_references(organization_id, None, request.location_id)
            .await?;

        let event = sqlx::query_as::<_, CompetitionEvent>(
            r#"
            INSERT INTO competition_events (competition_id, name, starts_at, location_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(competition_id)
        .bind(request.name.trim())
        .bind(request.starts_at)
        .bind(request.location_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    pub async fn delete_event(
        &self,
        organization_id: Uuid,
        competition_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<()> {
        self.get_competition(organization_id, competition_id).await?;

        let result = sqlx::query("DELETE FROM competition_events WHERE competition_id = $1 AND id = $2")
            .bind(competition_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        Ok(())
    }

    /// Referenced season and location must live in the same organization
    async fn check_references(
        &self,
        organization_id: Uuid,
        season_id: Option<Uuid>,
        location_id: Option<Uuid>,
    ) -> AppResult<()> {
        if let Some(season_id) = season_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM seasons WHERE id = $1 AND organization_id = $2)",
            )
            .bind(season_id)
            .bind(organization_id)
            .fetch_one(&self.pool)
            .await?;
            if !exists {
                return Err(AppError::Validation(
                    "season_id: Season does not belong to this organization".to_string(),
                ));
            }
        }

        if let Some(location_id) = location_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM locations WHERE id = $1 AND organization_id = $2)",
            )
            .bind(location_id)
            .bind(organization_id)
            .fetch_one(&self.pool)
            .await?;
            if !exists {
                return Err(AppError::Validation(
                    "location_id: Location does not belong to this organization".to_string(),
                ));
            }
        }

        Ok(())
    }
}
