//! Environment configuration for the Moodle connection.
//!
//! Values are read through a lookup closure so callers (and tests) can supply
//! them without touching the process environment.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for a Moodle web service account.
#[derive(Clone, PartialEq, Eq)]
pub struct MoodleConfig {
    /// Site root, without trailing slash (e.g. `https://moodle.example.edu`)
    pub base_url: String,
    /// Web service token
    pub token: String,
    /// Moodle user whose enrolments are mirrored
    pub user_id: i64,
    /// Timeout applied to every remote call
    pub timeout: Duration,
}

impl fmt::Debug for MoodleConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MoodleConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MoodleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = required_trimmed(&lookup, "MOODLE_URL")?;
        if !is_http_url(&base_url) {
            return Err(ConfigError::Invalid(
                "MOODLE_URL must start with http:// or https://".to_string(),
            ));
        }
        let base_url = base_url.trim_end_matches('/').to_string();

        let token = required_trimmed(&lookup, "MOODLE_TOKEN")?;

        let user_id = required_trimmed(&lookup, "MOODLE_USER_ID")?
            .parse::<i64>()
            .ok()
            .filter(|user_id| *user_id > 0)
            .ok_or_else(|| {
                ConfigError::Invalid("MOODLE_USER_ID must be a positive integer".to_string())
            })?;

        let timeout_secs = match optional_trimmed(&lookup, "MOODLE_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "MOODLE_TIMEOUT_SECS must be an integer in [1, {MAX_TIMEOUT_SECS}]"
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "MOODLE_TIMEOUT_SECS must be in [1, {MAX_TIMEOUT_SECS}]"
            )));
        }

        Ok(Self {
            base_url,
            token,
            user_id,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// REST endpoint for web service calls.
    pub fn rest_endpoint(&self) -> String {
        format!("{}/webservice/rest/server.php", self.base_url)
    }
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}
