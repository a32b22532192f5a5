//! Process-wide configuration
//!
//! Loaded once at startup from the environment (and `.env` when present),
//! then passed explicitly to whatever needs it.

use crate::error::OrchestrationError;
use crate::Result;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bearer credential for the generation and image services
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub image_size: String,
    pub image_generation_enabled: bool,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    /// Collection the aggregation pipelines run against
    pub mongodb_collection: String,
    pub port: u16,
    pub cors_allowed_origin: String,
    pub generation_timeout: Duration,
    pub image_timeout: Duration,
    pub query_timeout: Duration,
    /// Deadline for one whole `/rag` request
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o".to_string(),
            image_model: "gpt-image-1".to_string(),
            image_size: "1024x1024".to_string(),
            image_generation_enabled: true,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "analyticsDB".to_string(),
            mongodb_collection: "sales".to_string(),
            port: 8080,
            cors_allowed_origin: "http://localhost:3000".to_string(),
            generation_timeout: Duration::from_secs(60),
            image_timeout: Duration::from_secs(120),
            query_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup; unset keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, fallback: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };

        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                OrchestrationError::ConfigError(format!("PORT must be a port number: {}", e))
            })?,
            None => defaults.port,
        };

        Ok(Self {
            openai_api_key: text("OPENAI_API_KEY", defaults.openai_api_key),
            openai_base_url: text("OPENAI_BASE_URL", defaults.openai_base_url)
                .trim_end_matches('/')
                .to_string(),
            chat_model: text("OPENAI_CHAT_MODEL", defaults.chat_model),
            image_model: text("OPENAI_IMAGE_MODEL", defaults.image_model),
            image_size: text("OPENAI_IMAGE_SIZE", defaults.image_size),
            image_generation_enabled: parse_flag(
                lookup("IMAGE_GENERATION_ENABLED"),
                defaults.image_generation_enabled,
            )?,
            mongodb_uri: text("MONGODB_URI", defaults.mongodb_uri),
            mongodb_database: text("MONGODB_DATABASE", defaults.mongodb_database),
            mongodb_collection: text("MONGODB_COLLECTION", defaults.mongodb_collection),
            port,
            cors_allowed_origin: text("CORS_ALLOWED_ORIGIN", defaults.cors_allowed_origin),
            generation_timeout: parse_secs(
                "GENERATION_TIMEOUT_SECS",
                lookup("GENERATION_TIMEOUT_SECS"),
                defaults.generation_timeout,
            )?,
            image_timeout: parse_secs(
                "IMAGE_TIMEOUT_SECS",
                lookup("IMAGE_TIMEOUT_SECS"),
                defaults.image_timeout,
            )?,
            query_timeout: parse_secs(
                "QUERY_TIMEOUT_SECS",
                lookup("QUERY_TIMEOUT_SECS"),
                defaults.query_timeout,
            )?,
            request_timeout: parse_secs(
                "REQUEST_TIMEOUT_SECS",
                lookup("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout,
            )?,
        })
    }
}

fn parse_secs(key: &str, raw: Option<String>, fallback: Duration) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(fallback);
    };

    match raw.trim().parse::<u64>() {
        Ok(0) => Err(OrchestrationError::ConfigError(format!("{} must be positive", key))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(OrchestrationError::ConfigError(format!(
            "{} must be a whole number of seconds: {}",
            key, e
        ))),
    }
}

fn parse_flag(raw: Option<String>, fallback: bool) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(fallback);
    };

    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(OrchestrationError::ConfigError(format!(
            "IMAGE_GENERATION_ENABLED must be a boolean, got {:?}",
            other
        ))),
    }
}
