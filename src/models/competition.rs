//! Scheduling Models
//!
//! Locations, seasons, competitions, their events and roster entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::utils::validation::{country_validator, name_validator};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: String,

    #[validate(length(max = 500, message = "Address is too long"))]
    pub address: Option<String>,

    #[validate(length(max = 255, message = "City is too long"))]
    pub city: Option<String>,

    #[validate(custom(function = "country_validator"))]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Address is too long"))]
    pub address: Option<String>,

    #[validate(length(max = 255, message = "City is too long"))]
    pub city: Option<String>,

    #[validate(custom(function = "country_validator"))]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Season {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_season_dates"))]
pub struct SeasonRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Competition {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub season_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub name: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub description: Option<String>,
    pub source_import_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_competition_dates"))]
pub struct CompetitionRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: String,
    pub season_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,

    #[validate(length(max = 4000, message = "Description is too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetitionFilter {
    pub season_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompetitionEvent {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub location_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EventRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub location_id: Option<Uuid>,
}

/// Roster entry joined with team and athlete names
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RosterEntry {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub team_id: Uuid,
    pub team_name: String,
    pub athlete_id: Uuid,
    pub athlete_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntryRequest {
    pub team_id: Uuid,
    pub athlete_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterFilter {
    pub team_id: Option<Uuid>,
}

fn check_date_order(
    starts_on: Option<NaiveDate>,
    ends_on: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (starts_on, ends_on) {
        (Some(start), Some(end)) if end < start => {
            let mut error = ValidationError::new("date_order");
            error.message = Some("End date must not be before start date".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

fn validate_season_dates(request: &SeasonRequest) -> Result<(), ValidationError> {
    check_date_order(request.starts_on, request.ends_on)
}

fn validate_competition_dates(request: &CompetitionRequest) -> Result<(), ValidationError> {
    check_date_order(request.starts_on, request.ends_on)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_date_order() {
        let request = SeasonRequest {
            name: "2025 Outdoor".to_string(),
            starts_on: NaiveDate::from_ymd_opt(2025, 4, 1),
            ends_on: NaiveDate::from_ymd_opt(2025, 3, 1),
        };
        assert!(request.validate().is_err());

        let open_ended = SeasonRequest {
            ends_on: None,
            ..request
        };
        assert!(open_ended.validate().is_ok());
    }

    #[test]
    fn test_competition_request_validation() {
        let request: CompetitionRequest = serde_json::from_value(serde_json::json!({
            "name": "Spring Open",
            "starts_on": "2025-05-10",
            "ends_on": "2025-05-11"
        }))
        .unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_location_country_code() {
        let request = LocationRequest {
            name: "City Stadium".to_string(),
            address: None,
            city: Some("Porto".to_string()),
            country: Some("pt".to_string()),
        };
        assert!(request.validate().is_err());
    }
}
