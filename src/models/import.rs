//! Import Models
//!
//! Import jobs, the competition data extracted from an uploaded image, and the
//! summary of what reconciliation wrote.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
#[error("Unknown import {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// How the extraction is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Vision API called in-request
    Direct,
    /// Third-party webhook extracts and calls back
    Webhook,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Direct => "direct",
            ImportMode::Webhook => "webhook",
        }
    }
}

impl FromStr for ImportMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ImportMode::Direct),
            "webhook" => Ok(ImportMode::Webhook),
            other => Err(UnknownVariant {
                kind: "mode",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ImportMode {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Processing => "processing",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }
}

impl FromStr for ImportStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ImportStatus::Pending),
            "processing" => Ok(ImportStatus::Processing),
            "completed" => Ok(ImportStatus::Completed),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(UnknownVariant {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ImportStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ImportJob {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub mode: ImportMode,
    #[sqlx(try_from = "String")]
    pub status: ImportStatus,
    pub file_name: String,
    pub content_type: String,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub summary: Option<Json<ImportSummary>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Location as read from an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLocation {
    pub name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl ExtractedEvent {
    /// Start timestamp, when a date is known (midnight UTC without a time)
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        let date = self.date?;
        let time = self.time.or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
        Some(date.and_time(time).and_utc())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCompetition {
    pub name: String,
    pub season: Option<String>,
    pub location: Option<ExtractedLocation>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub description: Option<String>,
    pub events: Vec<ExtractedEvent>,
}

/// Normalized result of parsing a model or webhook response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImport {
    pub competitions: Vec<ExtractedCompetition>,
    /// Non-fatal problems found while parsing
    pub warnings: Vec<String>,
}

/// Created/matched counts for one entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTally {
    pub created: u32,
    pub matched: u32,
}

impl EntityTally {
    pub fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.matched += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub competitions: EntityTally,
    pub seasons: EntityTally,
    pub locations: EntityTally,
    pub events: EntityTally,
    pub competition_ids: Vec<Uuid>,
    pub warnings: Vec<String>,
}

/// Body the extraction webhook posts to `/imports/callback`
#[derive(Debug, Clone, Deserialize)]
pub struct ImportCallbackRequest {
    pub job_id: Uuid,
    pub status: CallbackStatus,
    /// Extraction payload; same loose shapes the vision model may return
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_strings() {
        for status in [
            ImportStatus::Pending,
            ImportStatus::Processing,
            ImportStatus::Completed,
            ImportStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ImportStatus>().unwrap(), status);
        }
        assert!("done".parse::<ImportStatus>().is_err());
        assert!(ImportStatus::Failed.is_terminal());
        assert!(!ImportStatus::Processing.is_terminal());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(ImportMode::try_from("webhook".to_string()).unwrap(), ImportMode::Webhook);
        assert!(ImportMode::try_from("batch".to_string()).is_err());
    }

    #[test]
    fn test_event_start_timestamp() {
        let event = ExtractedEvent {
            name: "100m Final".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1),
            time: NaiveTime::from_hms_opt(14, 30, 0),
        };
        assert_eq!(
            event.starts_at().unwrap().to_rfc3339(),
            "2025-06-01T14:30:00+00:00"
        );

        let undated = ExtractedEvent {
            date: None,
            ..event
        };
        assert!(undated.starts_at().is_none());
    }

    #[test]
    fn test_tally_record() {
        let mut tally = EntityTally::default();
        tally.record(true);
        tally.record(false);
        tally.record(false);
        assert_eq!(tally, EntityTally { created: 1, matched: 2 });
    }

    #[test]
    fn test_callback_request_deserialization() {
        let request: ImportCallbackRequest = serde_json::from_value(serde_json::json!({
            "job_id": "7f1c3b3e-4e8a-4f57-9d1a-0b6a2f8f2c11",
            "status": "failed",
            "error": "unreadable image"
        }))
        .unwrap();
        assert_eq!(request.status, CallbackStatus::Failed);
        assert!(request.data.is_none());
    }
}
