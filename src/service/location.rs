//! Location Service

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::database::Pagination;
use crate::models::competition::{Location, LocationRequest, UpdateLocationRequest};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::format_validation_errors;

#[derive(Clone)]
pub struct LocationService {
    pool: PgPool,
}

impl LocationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, organization_id: Uuid, pagination: Pagination) -> AppResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE organization_id = $1
            ORDER BY name, city
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(organization_id)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    pub async fn get(&self, organization_id: Uuid, location_id: Uuid) -> AppResult<Location> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(location_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Location not found".to_string()))
    }

    pub async fn create(&self, organization_id: Uuid, request: LocationRequest) -> AppResult<Location> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        let location = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (organization_id, name, address, city, country)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(request.name.trim())
        .bind(request.address)
        .bind(request.city)
        .bind(request.country)
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        location_id: Uuid,
        request: UpdateLocationRequest,
    ) -> AppResult<Location> {
        request
            .validate()
            .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

        sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations
            SET
                name = COALESCE($3, name),
                address = COALESCE($4, address),
                city = COALESCE($5, city),
                country = COALESCE($6, country),
                updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(location_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.address)
        .bind(request.city)
        .bind(request.country)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))
    }

    /// Competitions and events referencing the location keep existing without it
    pub async fn delete(&self, organization_id: Uuid, location_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(location_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Location not found".to_string()));
        }
        Ok(())
    }
}
