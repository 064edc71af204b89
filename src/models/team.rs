//! Team and Athlete Models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::{email_validator, name_validator};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub sport: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamAdmin {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: String,

    #[validate(length(min = 1, max = 100, message = "Sport must be 1-100 characters"))]
    pub sport: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Sport must be 1-100 characters"))]
    pub sport: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddTeamAdminRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Athlete {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub team_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub jersey_number: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAthleteRequest {
    pub team_id: Option<Uuid>,

    #[validate(custom(function = "name_validator"))]
    pub first_name: String,

    #[validate(custom(function = "name_validator"))]
    pub last_name: String,

    pub birth_date: Option<NaiveDate>,

    #[validate(custom(function = "email_validator"))]
    pub email: Option<String>,

    #[validate(range(min = 0, max = 999, message = "Jersey number must be 0-999"))]
    pub jersey_number: Option<i32>,
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAthleteRequest {
    pub team_id: Option<Uuid>,

    #[validate(custom(function = "name_validator"))]
    pub first_name: Option<String>,

    #[validate(custom(function = "name_validator"))]
    pub last_name: Option<String>,

    pub birth_date: Option<NaiveDate>,

    #[validate(custom(function = "email_validator"))]
    pub email: Option<String>,

    #[validate(range(min = 0, max = 999, message = "Jersey number must be 0-999"))]
    pub jersey_number: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AthleteFilter {
    pub team_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_athlete_validation() {
        let request: CreateAthleteRequest = serde_json::from_value(serde_json::json!({
            "first_name": "Ana",
            "last_name": "Silva",
            "birth_date": "2008-04-12",
            "jersey_number": 7
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.birth_date, NaiveDate::from_ymd_opt(2008, 4, 12));

        let bad = CreateAthleteRequest {
            jersey_number: Some(1000),
            ..request
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_create_team_rejects_empty_sport() {
        let request = CreateTeamRequest {
            name: "U17 Girls".to_string(),
            sport: Some(String::new()),
        };
        assert!(request.validate().is_err());
    }
}
