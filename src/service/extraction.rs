//! Extraction Parsing
//!
//! Turns the loosely-structured JSON that a vision model or extraction
//! webhook returns into [`ExtractedImport`]. Unknown fields are ignored, common
//! aliases are accepted, and recoverable problems become warnings.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::{Map, Value};

use crate::models::import::{
    ExtractedCompetition, ExtractedEvent, ExtractedImport, ExtractedLocation,
};
use crate::service::import_service::ImportError;
use crate::utils::validation::collapse_whitespace;

const LIST_KEYS: &[&str] = &["competitions", "events_list", "items", "results"];
const WRAPPER_KEYS: &[&str] = &["data", "result", "output"];
const NAME_KEYS: &[&str] = &["name", "title", "competition", "competition_name"];
const SEASON_KEYS: &[&str] = &["season", "season_name"];
const LOCATION_KEYS: &[&str] = &["location", "venue", "place"];
const START_KEYS: &[&str] = &["start_date", "starts_on", "date", "start"];
const END_KEYS: &[&str] = &["end_date", "ends_on", "end"];
const DESCRIPTION_KEYS: &[&str] = &["description", "notes"];
const EVENT_LIST_KEYS: &[&str] = &["events", "schedule", "sessions"];
const EVENT_NAME_KEYS: &[&str] = &["name", "title", "event", "discipline"];
const EVENT_DATE_KEYS: &[&str] = &["date", "day"];
const EVENT_TIME_KEYS: &[&str] = &["time", "start_time"];
const EVENT_DATETIME_KEYS: &[&str] = &["starts_at", "datetime", "start"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y", "%Y/%m/%d"];
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%H.%M", "%I:%M %p", "%I:%M%p"];

/// Parses a free-text model reply that should contain a JSON document
pub fn parse_model_reply(reply: &str) -> Result<ExtractedImport, ImportError> {
    let block = extract_json_block(reply)
        .ok_or_else(|| ImportError::InvalidResponse("no JSON document in reply".to_string()))?;

    let value: Value = serde_json::from_str(block)
        .map_err(|e| ImportError::InvalidResponse(format!("malformed JSON: {}", e)))?;

    parse_extraction(&value)
}

/// Returns the JSON document embedded in a model reply
///
/// The body of the first markdown code fence is searched first, then the whole
/// reply. The first candidate that parses completely as an object (or as an
/// array of objects) wins, so stray brackets in prose are skipped.
pub fn extract_json_block(text: &str) -> Option<&str> {
    fenced_body(text)
        .and_then(first_json_value)
        .or_else(|| first_json_value(text))
}

fn fenced_body(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let rest = &text[open + 3..];
    let body = rest.find("```").map_or(rest, |close| &rest[..close]);

    // drop an info string such as `json`
    match body.split_once('\n') {
        Some((info, inner)) if info.trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            Some(inner)
        }
        _ => Some(body),
    }
}

fn first_json_value(text: &str) -> Option<&str> {
    text.match_indices(['{', '[']).find_map(|(start, _)| {
        let candidate = &text[start..];
        let mut values = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) if may_hold_competitions(&value) => {
                Some(&candidate[..values.byte_offset()])
            }
            _ => None,
        }
    })
}

fn may_hold_competitions(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.is_empty() || items.iter().any(Value::is_object),
        _ => false,
    }
}

/// Parses an already-decoded JSON value
pub fn parse_extraction(value: &Value) -> Result<ExtractedImport, ImportError> {
    let mut warnings = Vec::new();
    let items = competition_items(value)?;

    let mut competitions = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let Some(object) = item.as_object() else {
            warnings.push(format!("entry #{} is not an object; skipped", index + 1));
            continue;
        };

        match parse_competition(object, &mut warnings) {
            Some(competition) => competitions.push(competition),
            None => warnings.push(format!("entry #{} has no name; skipped", index + 1)),
        }
    }

    if competitions.is_empty() {
        return Err(ImportError::EmptyExtraction);
    }

    Ok(ExtractedImport {
        competitions,
        warnings,
    })
}

fn competition_items(value: &Value) -> Result<Vec<&Value>, ImportError> {
    match value {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(map) => {
            if let Some(list) = first_field(map, LIST_KEYS).and_then(Value::as_array) {
                return Ok(list.iter().collect());
            }

            if first_field(map, NAME_KEYS).is_none() {
                if let Some(inner) = first_field(map, WRAPPER_KEYS)
                    .filter(|inner| inner.is_object() || inner.is_array())
                {
                    return competition_items(inner);
                }
            }

            match map.get("competition") {
                Some(inner @ Value::Object(_)) => Ok(vec![inner]),
                _ => Ok(vec![value]),
            }
        }
        _ => Err(ImportError::InvalidResponse(
            "expected a JSON object or array".to_string(),
        )),
    }
}

fn parse_competition(
    object: &Map<String, Value>,
    warnings: &mut Vec<String>,
) -> Option<ExtractedCompetition> {
    let name = text_field(object, NAME_KEYS)?;

    let season = first_field(object, SEASON_KEYS).and_then(|value| match value {
        Value::Object(inner) => text_field(inner, &["name"]),
        other => value_text(other),
    });

    let location = first_field(object, LOCATION_KEYS)
        .and_then(|value| parse_location(value, object, &name, warnings));

    let starts_on = date_field(object, START_KEYS, &name, "start date", warnings);
    let mut ends_on = date_field(object, END_KEYS, &name, "end date", warnings);
    if let (Some(start), Some(end)) = (starts_on, ends_on) {
        if end < start {
            warnings.push(format!(
                "competition '{}': end date {} precedes start date {}; end date dropped",
                name, end, start
            ));
            ends_on = None;
        }
    }

    let single_day = starts_on.is_some() && (ends_on.is_none() || ends_on == starts_on);
    let default_event_date = if single_day { starts_on } else { None };

    let events = first_field(object, EVENT_LIST_KEYS)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| parse_event(item, default_event_date, &name, warnings))
                .collect()
        })
        .unwrap_or_default();

    Some(ExtractedCompetition {
        season,
        location,
        starts_on,
        ends_on,
        description: text_field(object, DESCRIPTION_KEYS),
        events,
        name,
    })
}

fn parse_location(
    value: &Value,
    competition: &Map<String, Value>,
    competition_name: &str,
    warnings: &mut Vec<String>,
) -> Option<ExtractedLocation> {
    let (name, source) = match value {
        Value::Object(inner) => (text_field(inner, &["name", "venue", "title"])?, inner),
        other => (value_text(other)?, competition),
    };

    let country = text_field(source, &["country_code", "country"]).and_then(|country| {
        let code = country.to_ascii_uppercase();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(code)
        } else {
            warnings.push(format!(
                "competition '{}': country '{}' is not a two-letter code; ignored",
                competition_name, country
            ));
            None
        }
    });

    Some(ExtractedLocation {
        name,
        city: text_field(source, &["city", "town"]),
        address: text_field(source, &["address", "street"]),
        country,
    })
}

fn parse_event(
    item: &Value,
    default_date: Option<NaiveDate>,
    competition_name: &str,
    warnings: &mut Vec<String>,
) -> Option<ExtractedEvent> {
    let object = match item {
        Value::Object(object) => object,
        other => {
            return value_text(other).map(|name| ExtractedEvent {
                name,
                date: default_date,
                time: None,
            })
        }
    };

    let Some(name) = text_field(object, EVENT_NAME_KEYS) else {
        warnings.push(format!(
            "competition '{}': event without a name skipped",
            competition_name
        ));
        return None;
    };

    if let Some(timestamp) = text_field(object, EVENT_DATETIME_KEYS)
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
    {
        return Some(ExtractedEvent {
            name,
            date: Some(timestamp.date_naive()),
            time: Some(timestamp.time()),
        });
    }

    let label = format!("event '{}' date", name);
    let date = date_field(object, EVENT_DATE_KEYS, competition_name, &label, warnings)
        .or(default_date);

    let time = text_field(object, EVENT_TIME_KEYS).and_then(|raw| {
        let parsed = parse_time(&raw);
        if parsed.is_none() {
            warnings.push(format!(
                "competition '{}': unrecognized time '{}' for event '{}'",
                competition_name, raw, name
            ));
        }
        parsed
    });

    Some(ExtractedEvent { name, date, time })
}

fn first_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let collapsed = collapse_whitespace(s);
            (!collapsed.is_empty()).then_some(collapsed)
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(value_text)
}

fn date_field(
    object: &Map<String, Value>,
    keys: &[&str],
    competition_name: &str,
    label: &str,
    warnings: &mut Vec<String>,
) -> Option<NaiveDate> {
    let raw = text_field(object, keys)?;
    let parsed = parse_date(&raw);
    if parsed.is_none() {
        warnings.push(format!(
            "competition '{}': unrecognized {} '{}'",
            competition_name, label, raw
        ));
    }
    parsed
}

/// Parses the date formats commonly found on printed schedules
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    let upper = raw.to_ascii_uppercase();

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&upper, format).ok())
}
