//! Import Reconciliation
//!
//! Writes an [`ExtractedImport`] into an organization's schedule. Every lookup
//! compares names normalized by the same SQL expression on both sides, so
//! replaying the same extraction only produces matches. All statements run on
//! the caller's connection, which is expected to be inside a transaction.
//!
//! Reconciliations for one organization are serialized with a transaction-level
//! advisory lock; otherwise two imports could both miss and insert the same row.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::import::{
    ExtractedCompetition, ExtractedEvent, ExtractedImport, ExtractedLocation, ImportSummary,
};
use crate::utils::validation::collapse_whitespace as collapse;

/// Case-folded, whitespace-collapsed form of a column or parameter
macro_rules! normalized {
    ($expr:literal) => {
        concat!("LOWER(btrim(regexp_replace(", $expr, ", '\\s+', ' ', 'g')))")
    };
}

/// Reconciles every extracted competition, returning what was created and matched
pub async fn reconcile(
    conn: &mut PgConnection,
    organization_id: Uuid,
    job_id: Uuid,
    extraction: &ExtractedImport,
) -> Result<ImportSummary, sqlx::Error> {
    let mut summary = ImportSummary {
        warnings: extraction.warnings.clone(),
        ..Default::default()
    };

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
        .bind(organization_id)
        .execute(&mut *conn)
        .await?;

    for competition in &extraction.competitions {
        let season_id = match competition.season.as_deref() {
            Some(name) => {
                let (id, created) = upsert_season(conn, organization_id, name).await?;
                summary.seasons.record(created);
                Some(id)
            }
            None => None,
        };

        let location_id = match &competition.location {
            Some(location) => {
                let (id, created) = upsert_location(conn, organization_id, location).await?;
                summary.locations.record(created);
                Some(id)
            }
            None => None,
        };

        let (competition_id, created) = upsert_competition(
            conn,
            organization_id,
            job_id,
            competition,
            season_id,
            location_id,
        )
        .await?;
        summary.competitions.record(created);
        if !summary.competition_ids.contains(&competition_id) {
            summary.competition_ids.push(competition_id);
        }

        for event in &competition.events {
            let (_, created) = upsert_event(conn, competition_id, event, location_id).await?;
            summary.events.record(created);
        }
    }

    Ok(summary)
}

async fn upsert_season(
    conn: &mut PgConnection,
    organization_id: Uuid,
    name: &str,
) -> Result<(Uuid, bool), sqlx::Error> {
    let existing: Option<Uuid> = sqlx::query_scalar(concat!(
        "SELECT id FROM seasons WHERE organization_id = $1 AND ",
        normalized!("name"),
        " = ",
        normalized!("$2"),
        " LIMIT 1"
    ))
    .bind(organization_id)
    .bind(collapse(name))
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        return Ok((id, false));
    }

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO seasons (organization_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(organization_id)
    .bind(collapse(name))
    .fetch_one(&mut *conn)
    .await?;

    Ok((id, true))
}

async fn upsert_location(
    conn: &mut PgConnection,
    organization_id: Uuid,
    location: &ExtractedLocation,
) -> Result<(Uuid, bool), sqlx::Error> {
    let existing: Option<Uuid> = sqlx::query_scalar(concat!(
        "SELECT id FROM locations WHERE organization_id = $1 AND ",
        normalized!("name"),
        " = ",
        normalized!("$2"),
        " AND COALESCE(",
        normalized!("city"),
        ", '') = COALESCE(",
        normalized!("$3"),
        ", '') LIMIT 1"
    ))
    .bind(organization_id)
    .bind(collapse(&location.name))
    .bind(location.city.as_deref().map(collapse))
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        sqlx::query(
            r#"
            UPDATE locations
            SET address = COALESCE(address, $2), country = COALESCE(country, $3), updated_at = NOW()
            WHERE id = $1 AND (address IS NULL OR country IS NULL)
            "#,
        )
        .bind(id)
        .bind(location.address.as_deref())
        .bind(location.country.as_deref())
        .execute(&mut *conn)
        .await?;

        return Ok((id, false));
    }

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO locations (organization_id, name, city, address, country)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(collapse(&location.name))
    .bind(location.city.as_deref().map(collapse))
    .bind(location.address.as_deref())
    .bind(location.country.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    Ok((id, true))
}

/// Matches on name, season and start date; a match only gets its gaps filled
async fn upsert_competition(
    conn: &mut PgConnection,
    organization_id: Uuid,
    job_id: Uuid,
    competition: &ExtractedCompetition,
    season_id: Option<Uuid>,
    location_id: Option<Uuid>,
) -> Result<(Uuid, bool), sqlx::Error> {
    let existing: Option<Uuid> = sqlx::query_scalar(concat!(
        "SELECT id FROM competitions WHERE organization_id = $1 AND ",
        normalized!("name"),
        " = ",
        normalized!("$2"),
        " AND season_id IS NOT DISTINCT FROM $3 AND starts_on IS NOT DISTINCT FROM $4 LIMIT 1"
    ))
    .bind(organization_id)
    .bind(collapse(&competition.name))
    .bind(season_id)
    .bind(competition.starts_on)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        sqlx::query(
            r#"
            UPDATE competitions
            SET
                location_id = COALESCE(location_id, $2),
                ends_on = COALESCE(ends_on, $3),
                description = COALESCE(description, $4),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(location_id)
        .bind(competition.ends_on)
        .bind(competition.description.as_deref())
        .execute(&mut *conn)
        .await?;

        return Ok((id, false));
    }

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO competitions
            (organization_id, season_id, location_id, name, starts_on, ends_on, description, source_import_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(season_id)
    .bind(location_id)
    .bind(collapse(&competition.name))
    .bind(competition.starts_on)
    .bind(competition.ends_on)
    .bind(competition.description.as_deref())
    .bind(job_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok((id, true))
}

async fn upsert_event(
    conn: &mut PgConnection,
    competition_id: Uuid,
    event: &ExtractedEvent,
    location_id: Option<Uuid>,
) -> Result<(Uuid, bool), sqlx::Error> {
    let starts_at: Option<DateTime<Utc>> = event.starts_at();

    let existing: Option<Uuid> = sqlx::query_scalar(concat!(
        "SELECT id FROM competition_events WHERE competition_id = $1 AND ",
        normalized!("name"),
        " = ",
        normalized!("$2"),
        " AND starts_at IS NOT DISTINCT FROM $3 LIMIT 1"
    ))
    .bind(competition_id)
    .bind(collapse(&event.name))
    .bind(starts_at)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        return Ok((id, false));
    }

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO competition_events (competition_id, name, starts_at, location_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(competition_id)
    .bind(collapse(&event.name))
    .bind(starts_at)
    .bind(location_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok((id, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::import::EntityTally;
    use chrono::{NaiveDate, NaiveTime};
    use sqlx::PgPool;

    #[test]
    fn test_normalized_sql_fragment() {
        assert_eq!(
            normalized!("$2"),
            "LOWER(btrim(regexp_replace($2, '\\s+', ' ', 'g')))"
        );
        assert_eq!(collapse("  Spring \t Open "), "Spring Open");
    }

    fn extraction() -> ExtractedImport {
        ExtractedImport {
            competitions: vec![ExtractedCompetition {
                name: "Spring Open".to_string(),
                season: Some("2025 Outdoor".to_string()),
                location: Some(ExtractedLocation {
                    name: "City Stadium".to_string(),
                    city: Some("Porto".to_string()),
                    address: None,
                    country: Some("PT".to_string()),
                }),
                starts_on: NaiveDate::from_ymd_opt(2025, 5, 10),
                ends_on: NaiveDate::from_ymd_opt(2025, 5, 11),
                description: None,
                events: vec![ExtractedEvent {
                    name: "100m Final".to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 5, 11),
                    time: NaiveTime::from_hms_opt(16, 0, 0),
                }],
            }],
            warnings: vec!["competition 'Spring Open': unrecognized time 'noon'".to_string()],
        }
    }

    async fn seed(pool: &PgPool) -> (Uuid, Uuid) {
        let org: Uuid = sqlx::query_scalar(
            "INSERT INTO organizations (name, slug) VALUES ('Club', 'club') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let job = add_job(pool, org).await;
        (org, job)
    }

    async fn add_job(pool: &PgPool, org: Uuid) -> Uuid {
        let job = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO import_jobs (id, organization_id, mode, status, file_name, content_type, storage_path)
            VALUES ($1, $2, 'direct', 'processing', 'a.png', 'image/png', '/tmp/a.png')
            "#,
        )
        .bind(job)
        .bind(org)
        .execute(pool)
        .await
        .unwrap();
        job
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_reconcile_is_idempotent(pool: PgPool) {
        let (org, job) = seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let first = reconcile(&mut conn, org, job, &extraction()).await.unwrap();
        assert_eq!(first.competitions, EntityTally { created: 1, matched: 0 });
        assert_eq!(first.seasons, EntityTally { created: 1, matched: 0 });
        assert_eq!(first.locations, EntityTally { created: 1, matched: 0 });
        assert_eq!(first.events, EntityTally { created: 1, matched: 0 });
        assert_eq!(first.warnings.len(), 1);

        let mut noisy = extraction();
        noisy.competitions[0].name = "  spring   OPEN".to_string();
        noisy.competitions[0].season = Some("2025 outdoor".to_string());

        let second = reconcile(&mut conn, org, job, &noisy).await.unwrap();
        assert_eq!(second.competitions, EntityTally { created: 0, matched: 1 });
        assert_eq!(second.events, EntityTally { created: 0, matched: 1 });
        assert_eq!(second.competition_ids, first.competition_ids);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM competitions")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_match_fills_missing_fields_only(pool: PgPool) {
        let (org, job) = seed(&pool).await;
        sqlx::query(
            "INSERT INTO competitions (organization_id, name, starts_on, description) VALUES ($1, 'Spring Open', '2025-05-10', 'Keep me')",
        )
        .bind(org)
        .execute(&pool)
        .await
        .unwrap();

        let mut data = extraction();
        data.competitions[0].season = None;
        data.competitions[0].description = Some("Replace me".to_string());

        let mut conn = pool.acquire().await.unwrap();
        let summary = reconcile(&mut conn, org, job, &data).await.unwrap();
        assert_eq!(summary.competitions.matched, 1);

        let (description, ends_on, location): (Option<String>, Option<NaiveDate>, Option<Uuid>) =
            sqlx::query_as("SELECT description, ends_on, location_id FROM competitions")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(description.as_deref(), Some("Keep me"));
        assert_eq!(ends_on, NaiveDate::from_ymd_opt(2025, 5, 11));
        assert!(location.is_some());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_location_city_distinguishes_venues(pool: PgPool) {
        let (org, _) = seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let porto = ExtractedLocation {
            name: "City Stadium".to_string(),
            city: Some("Porto".to_string()),
            ..Default::default()
        };
        let lisbon = ExtractedLocation {
            city: Some("Lisbon".to_string()),
            ..porto.clone()
        };
        let no_city = ExtractedLocation {
            city: None,
            ..porto.clone()
        };

        let (a, created_a) = upsert_location(&mut conn, org, &porto).await.unwrap();
        let (b, created_b) = upsert_location(&mut conn, org, &lisbon).await.unwrap();
        let (c, created_c) = upsert_location(&mut conn, org, &no_city).await.unwrap();
        let (d, created_d) = upsert_location(&mut conn, org, &no_city).await.unwrap();

        assert!(created_a && created_b && created_c && !created_d);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(c, d);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_overlapping_imports_share_rows(pool: PgPool) {
        let (org, job_a) = seed(&pool).await;
        let job_b = add_job(&pool, org).await;

        let mut tx_a = pool.begin().await.unwrap();
        let first = reconcile(&mut *tx_a, org, job_a, &extraction()).await.unwrap();
        assert_eq!(first.competitions.created, 1);

        // blocks on the organization lock until the first transaction commits
        let second = tokio::spawn({
            let pool = pool.clone();
            async move {
                let mut tx_b = pool.begin().await.unwrap();
                let summary = reconcile(&mut *tx_b, org, job_b, &extraction()).await.unwrap();
                tx_b.commit().await.unwrap();
                summary
            }
        });

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!second.is_finished());
        tx_a.commit().await.unwrap();

        let second = second.await.unwrap();
        assert_eq!(second.competitions, EntityTally { created: 0, matched: 1 });
        assert_eq!(second.seasons, EntityTally { created: 0, matched: 1 });
        assert_eq!(second.competition_ids, first.competition_ids);

        let (competitions, seasons, locations): (i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM competitions), (SELECT COUNT(*) FROM seasons), (SELECT COUNT(*) FROM locations)",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!((competitions, seasons, locations), (1, 1, 1));
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_season_matches_regardless_of_spacing(pool: PgPool) {
        let (org, _) = seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let (id, created) = upsert_season(&mut conn, org, "Été 2025").await.unwrap();
        assert!(created);

        for variant in ["Été 2025", "\tÉté\u{a0}\u{a0}2025 ", " Été   2025\n"] {
            let (again, created) = upsert_season(&mut conn, org, variant).await.unwrap();
            assert_eq!((again, created), (id, false), "{:?}", variant);
        }

        let name: String = sqlx::query_scalar("SELECT name FROM seasons WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(name, "Été 2025");
    }
}
