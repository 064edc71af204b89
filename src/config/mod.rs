//! Configuration Module
//!
//! Centralized configuration for the league service: HTTP server, database,
//! JWT, the vision model used by direct imports, and the import pipeline.

use thiserror::Error;

use crate::utils::validation::validate_url;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Environment variable helpers
pub mod env {
    use super::ConfigError;
    use std::env;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get optional, non-empty environment variable
    pub fn get_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    /// Get environment variable as boolean with default
    pub fn get_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u32 with default
    pub fn get_u32(key: &str, default: u32) -> u32 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u16 with default
    pub fn get_u16(key: &str, default: u16) -> u16 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u64 with default
    pub fn get_u64(key: &str, default: u64) -> u64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as usize with default
    pub fn get_usize(key: &str, default: usize) -> usize {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i64 with default
    pub fn get_i64(key: &str, default: i64) -> i64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a comma-separated list with default
    pub fn get_list(key: &str, default: &str) -> Vec<String> {
        get_string(key, default)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Get required environment variable
    pub fn get_required(key: &str) -> Result<String, ConfigError> {
        get_optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub jwt: JwtConfig,
    /// Present only when a vision API key is configured
    pub vision: Option<VisionConfig>,
    pub import: ImportConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_request_size: usize,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_expires_minutes: i64,
    pub refresh_token_expires_days: i64,
}

/// OpenAI-compatible chat completions endpoint used for image extraction
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

/// Upload handling and third-party webhook settings for imports
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    /// Externally reachable base URL used to build the callback address
    pub public_base_url: String,
    pub webhook_timeout_seconds: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port: env::get_u16("SERVER_PORT", 3000),
            cors_origins: env::get_list("CORS_ORIGINS", "*"),
            max_request_size: env::get_usize("MAX_REQUEST_SIZE", 12 * 1024 * 1024),
        }
    }
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::get_required("DATABASE_URL")?,
            max_connections: env::get_u32("DB_MAX_CONNECTIONS", 10),
            min_connections: env::get_u32("DB_MIN_CONNECTIONS", 1),
            connect_timeout_seconds: env::get_u64("DB_CONNECT_TIMEOUT", 10),
            idle_timeout_seconds: env::get_u64("DB_IDLE_TIMEOUT", 600),
            max_lifetime_seconds: env::get_u64("DB_MAX_LIFETIME", 3600),
        })
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_secret: env::get_required("JWT_ACCESS_SECRET")?,
            refresh_secret: env::get_required("JWT_REFRESH_SECRET")?,
            access_token_expires_minutes: env::get_i64("JWT_ACCESS_EXPIRES_MINUTES", 60),
            refresh_token_expires_days: env::get_i64("JWT_REFRESH_EXPIRES_DAYS", 30),
        })
    }
}

impl VisionConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = env::get_optional("VISION_API_KEY")?;

        Some(Self {
            api_base_url: env::get_string("VISION_API_BASE_URL", "https://api.openai.com/v1"),
            api_key,
            model: env::get_string("VISION_MODEL", "gpt-4o-mini"),
            max_tokens: env::get_u32("VISION_MAX_TOKENS", 4096),
            timeout_seconds: env::get_u64("VISION_TIMEOUT_SECONDS", 90),
        })
    }
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self {
            upload_dir: env::get_string("IMPORT_UPLOAD_DIR", "uploads"),
            max_upload_bytes: env::get_usize("IMPORT_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            allowed_content_types: env::get_list(
                "IMPORT_ALLOWED_CONTENT_TYPES",
                "image/png,image/jpeg,image/webp,image/gif",
            ),
            webhook_url: env::get_optional("IMPORT_WEBHOOK_URL"),
            webhook_secret: env::get_optional("IMPORT_WEBHOOK_SECRET"),
            public_base_url: env::get_string("PUBLIC_BASE_URL", "http://localhost:3000"),
            webhook_timeout_seconds: env::get_u64("IMPORT_WEBHOOK_TIMEOUT_SECONDS", 30),
        }
    }

    /// Address the webhook posts results back to
    pub fn callback_url(&self) -> String {
        format!(
            "{}/imports/callback",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/webp".to_string(),
                "image/gif".to_string(),
            ],
            webhook_url: None,
            webhook_secret: None,
            public_base_url: "http://localhost:3000".to_string(),
            webhook_timeout_seconds: 30,
        }
    }
}

impl AppConfig {
    /// Load complete application configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env(),
            database: DatabaseSettings::from_env()?,
            jwt: JwtConfig::from_env()?,
            vision: VisionConfig::from_env(),
            import: ImportConfig::from_env(),
        })
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("SERVER_PORT", "must be greater than 0"));
        }

        if self.database.max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "must be greater than 0"));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(invalid(
                "DB_MIN_CONNECTIONS",
                "cannot be greater than DB_MAX_CONNECTIONS",
            ));
        }

        if self.jwt.access_secret == self.jwt.refresh_secret {
            return Err(invalid(
                "JWT_REFRESH_SECRET",
                "access and refresh secrets must be different",
            ));
        }

        if self.jwt.access_token_expires_minutes <= 0 || self.jwt.refresh_token_expires_days <= 0
        {
            return Err(invalid("JWT_*_EXPIRES", "token lifetimes must be positive"));
        }

        if self.import.max_upload_bytes == 0 {
            return Err(invalid("IMPORT_MAX_UPLOAD_BYTES", "must be greater than 0"));
        }

        if self.import.max_upload_bytes >= self.server.max_request_size {
            return Err(invalid(
                "IMPORT_MAX_UPLOAD_BYTES",
                "must be smaller than MAX_REQUEST_SIZE",
            ));
        }

        if self.import.public_base_url.is_empty() || !validate_url(&self.import.public_base_url) {
            return Err(invalid("PUBLIC_BASE_URL", "must be an http(s) URL"));
        }

        if let Some(url) = &self.import.webhook_url {
            if url.is_empty() || !validate_url(url) {
                return Err(invalid("IMPORT_WEBHOOK_URL", "must be an http(s) URL"));
            }
        }

        if let Some(vision) = &self.vision {
            if vision.api_base_url.is_empty() || !validate_url(&vision.api_base_url) {
                return Err(invalid("VISION_API_BASE_URL", "must be an http(s) URL"));
            }
        }

        if self.import.webhook_url.is_some() && self.import.webhook_secret.is_none() {
            return Err(invalid(
                "IMPORT_WEBHOOK_SECRET",
                "required when IMPORT_WEBHOOK_URL is set",
            ));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
