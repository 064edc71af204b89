//! Validation Utilities
//!
//! Input validation and normalization for request payloads and imported data.

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// Validates email address format using a comprehensive regex pattern
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    regex.is_match(email.trim())
}

/// Normalizes email address to lowercase and removes whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims and collapses internal whitespace, keeping case
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validates a display name (organizations, teams, competitions, people)
///
/// Names are 1-255 characters after trimming and may not contain control
/// characters or angle brackets.
pub fn validate_display_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 255 {
        return false;
    }

    !trimmed
        .chars()
        .any(|c| c.is_control() || c == '<' || c == '>')
}

/// Validates a URL-safe slug: lowercase letters, digits and single hyphens
pub fn validate_slug(slug: &str) -> bool {
    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = SLUG_REGEX.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("Failed to compile slug regex")
    });

    slug.len() <= 100 && regex.is_match(slug)
}

/// Derives a slug from a display name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug.truncate(100);
    slug.trim_end_matches('-').to_string()
}

/// Validates an ISO-3166 alpha-2 country code
pub fn validate_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Validates URL format
pub fn validate_url(url: &str) -> bool {
    if url.is_empty() {
        return true;
    }

    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("Failed to compile URL regex")
    });

    regex.is_match(url) && url.len() <= 512
}

/// Password strength: at least one uppercase, one lowercase and one digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if has_upper && has_lower && has_digit {
        Ok(())
    } else {
        let mut error = ValidationError::new("weak_password");
        error.message = Some(messages::WEAK_PASSWORD.into());
        Err(error)
    }
}

/// Custom validator for email fields using the validator crate
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email) {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_email");
        error.message = Some(messages::INVALID_EMAIL.into());
        Err(error)
    }
}

/// Custom validator for display names using the validator crate
pub fn name_validator(name: &str) -> Result<(), ValidationError> {
    if validate_display_name(name) {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_name");
        error.message = Some(messages::INVALID_NAME.into());
        Err(error)
    }
}

/// Custom validator for slugs using the validator crate
pub fn slug_validator(slug: &str) -> Result<(), ValidationError> {
    if validate_slug(slug) {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_slug");
        error.message = Some(messages::INVALID_SLUG.into());
        Err(error)
    }
}

/// Custom validator for country codes using the validator crate
pub fn country_validator(code: &str) -> Result<(), ValidationError> {
    if validate_country_code(code) {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_country");
        error.message = Some(messages::INVALID_COUNTRY.into());
        Err(error)
    }
}

/// Flattens validator errors into a single readable message
pub fn format_validation_errors(err: &validator::ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, errors) in err.field_errors() {
        for error in errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for field '{}'", field));
            messages.push(format!("{}: {}", field, message));
        }
    }

    messages.sort();
    messages.join(", ")
}

/// Validation error messages for user-friendly responses
pub mod messages {
    pub const INVALID_EMAIL: &str = "Please enter a valid email address";
    pub const INVALID_NAME: &str =
        "Name must be 1-255 characters without control characters or angle brackets";
    pub const INVALID_SLUG: &str =
        "Slug may only contain lowercase letters, digits and single hyphens";
    pub const INVALID_COUNTRY: &str = "Country must be a two-letter ISO code such as 'DE'";
    pub const WEAK_PASSWORD: &str =
        "Password must contain an uppercase letter, a lowercase letter and a digit";
}
