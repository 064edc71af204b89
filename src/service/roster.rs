//! Roster Service
//!
//! Which athletes a team enters into a competition.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::competition::{RosterEntry, RosterEntryRequest, RosterFilter};
use crate::utils::error::{AppError, AppResult};

const ENTRY_SELECT: &str = r#"
    SELECT r.id, r.competition_id, r.team_id, t.name AS team_name, r.athlete_id,
           a.first_name || ' ' || a.last_name AS athlete_name, r.created_at
    FROM roster_entries r
    JOIN competitions c ON c.id = r.competition_id
    JOIN teams t ON t.id = r.team_id
    JOIN athletes a ON a.id = r.athlete_id
    WHERE c.organization_id = $1 AND r.competition_id = $2
"#;

#[derive(Clone)]
pub struct RosterService {
    pool: PgPool,
}

impl RosterService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        competition_id: Uuid,
        filter: &RosterFilter,
    ) -> AppResult<Vec<RosterEntry>> {
        self.ensure_competition(organization_id, competition_id).await?;

        let entries = sqlx::query_as::<_, RosterEntry>(&format!(
            "{} AND ($3::uuid IS NULL OR r.team_id = $3) ORDER BY t.name, a.last_name, a.first_name",
            ENTRY_SELECT
        ))
        .bind(organization_id)
        .bind(competition_id)
        .bind(filter.team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn get(
        &self,
        organization_id: Uuid,
        competition_id: Uuid,
        entry_id: Uuid,
    ) -> AppResult<RosterEntry> {
        sqlx::query_as::<_, RosterEntry>(&format!("{} AND r.id = $3", ENTRY_SELECT))
            .bind(organization_id)
            .bind(competition_id)
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Roster entry not found".to_string()))
    }

    /// Enters an athlete for a team; both must belong to the competition's organization
    pub async fn add(
        &self,
        organization_id: Uuid,
        competition_id: Uuid,
        request: RosterEntryRequest,
    ) -> AppResult<RosterEntry> {
        self.ensure_competition(organization_id, competition_id).await?;

        let (team_ok, athlete_ok): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM teams WHERE id = $1 AND organization_id = $3),
                EXISTS (SELECT 1 FROM athletes WHERE id = $2 AND organization_id = $3)
            "#,
        )
        .bind(request.team_id)
        .bind(request.athlete_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        if !team_ok {
            return Err(AppError::Validation(
                "team_id: Team does not belong to this organization".to_string(),
            ));
        }
        if !athlete_ok {
            return Err(AppError::Validation(
                "athlete_id: Athlete does not belong to this organization".to_string(),
            ));
        }

        let entry_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO roster_entries (competition_id, team_id, athlete_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(competition_id)
        .bind(request.team_id)
        .bind(request.athlete_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(e, "Athlete is already on this team's roster")
        })?;

        self.get(organization_id, competition_id, entry_id).await
    }

    pub async fn remove(&self, organization_id: Uuid, competition_id: Uuid, entry_id: Uuid) -> AppResult<()> {
        let entry = self.get(organization_id, competition_id, entry_id).await?;

        sqlx::query("DELETE FROM roster_entries WHERE id = $1")
            .bind(entry.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ensure_competition(&self, organization_id: Uuid, competition_id: Uuid) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM competitions WHERE id = $1 AND organization_id = $2)",
        )
        .bind(competition_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound("Competition not found".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        org: Uuid,
        competition: Uuid,
        team: Uuid,
        athlete: Uuid,
    }

    async fn seed(pool: &PgPool) -> Fixture {
        let org: Uuid = sqlx::query_scalar(
            "INSERT INTO organizations (name, slug) VALUES ('Club', 'club') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let competition: Uuid = sqlx::query_scalar(
            "INSERT INTO competitions (organization_id, name) VALUES ($1, 'Cup') RETURNING id",
        )
        .bind(org)
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
        let athlete: Uuid = sqlx::query_scalar(
            "INSERT INTO athletes (organization_id, team_id, first_name, last_name) VALUES ($1, $2, 'Ana', 'Silva') RETURNING id",
        )
        .bind(org)
        .bind(team)
        .fetch_one(pool)
        .await
        .unwrap();

        Fixture {
            org,
            competition,
            team,
            athlete,
        }
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_roster_add_and_duplicate(pool: PgPool) {
        let f = seed(&pool).await;
        let service = RosterService::new(pool);
        let request = RosterEntryRequest {
            team_id: f.team,
            athlete_id: f.athlete,
        };

        let entry = service.add(f.org, f.competition, request.clone()).await.unwrap();
        assert_eq!(entry.athlete_name, "Ana Silva");
        assert_eq!(entry.team_name, "U17");

        assert!(matches!(
            service.add(f.org, f.competition, request).await,
            Err(AppError::Conflict(_))
        ));

        let filtered = service
            .list(f.org, f.competition, &RosterFilter { team_id: Some(Uuid::new_v4()) })
            .await
            .unwrap();
        assert!(filtered.is_empty());

        service.remove(f.org, f.competition, entry.id).await.unwrap();
        assert!(service
            .list(f.org, f.competition, &RosterFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_roster_rejects_foreign_athlete(pool: PgPool) {
        let f = seed(&pool).await;
        let service = RosterService::new(pool);

        let result = service
            .add(
                f.org,
                f.competition,
                RosterEntryRequest {
                    team_id: f.team,
                    athlete_id: Uuid::new_v4(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
