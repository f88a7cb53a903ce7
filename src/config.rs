//! Runtime configuration
//!
//! Values come from the environment first and are then overridden by CLI
//! flags in `main.rs`. Lookup goes through a closure so tests never have to
//! touch the process environment.

use crate::browser::BrowserConfig;
use crate::error::{ConfigError, Result};
use std::time::Duration;

/// Environment variable holding the model API key
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
/// Environment variable selecting the model name
pub const MODEL_ENV_VAR: &str = "A11YSCAN_MODEL";
/// Environment variable overriding the model endpoint base URL
pub const ENDPOINT_ENV_VAR: &str = "A11YSCAN_MODEL_ENDPOINT";
/// Environment variable pointing at the Chrome/Chromium binary
pub const CHROME_PATH_ENV_VAR: &str = "CHROME_PATH";
/// Environment variable disabling the Chrome sandbox (containers)
pub const NO_SANDBOX_ENV_VAR: &str = "A11YSCAN_NO_SANDBOX";
/// Environment variable capping concurrent analyses in server mode
pub const MAX_CONCURRENT_ENV_VAR: &str = "A11YSCAN_MAX_CONCURRENT";
/// Environment variable for the whole-analysis time budget
pub const ANALYSIS_TIMEOUT_ENV_VAR: &str = "A11YSCAN_ANALYSIS_TIMEOUT_SECS";

/// Default model name
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
/// Default model endpoint base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Model API key
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Model endpoint base URL
    pub endpoint: String,
    /// Whether to call the model at all
    pub enrichment_enabled: bool,
    /// Model request timeout
    pub model_timeout: Duration,
    /// Whole-analysis time budget
    pub analysis_timeout: Duration,
    /// Concurrent analyses allowed by the HTTP server
    pub max_concurrent: usize,
    /// Browser settings
    pub browser: BrowserConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("enrichment_enabled", &self.enrichment_enabled)
            .field("model_timeout", &self.model_timeout)
            .field("analysis_timeout", &self.analysis_timeout)
            .field("max_concurrent", &self.max_concurrent)
            .field("browser", &self.browser)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            enrichment_enabled: true,
            model_timeout: Duration::from_secs(60),
            analysis_timeout: Duration::from_secs(120),
            max_concurrent: 2,
            browser: BrowserConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = Self {
            api_key: get(API_KEY_ENV_VAR),
            ..Self::default()
        };

        if let Some(model) = get(MODEL_ENV_VAR) {
            config.model = model;
        }
        if let Some(endpoint) = get(ENDPOINT_ENV_VAR) {
            config.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(path) = get(CHROME_PATH_ENV_VAR) {
            config.browser.chrome_path = Some(path);
        }
        if let Some(flag) = get(NO_SANDBOX_ENV_VAR) {
            config.browser.sandbox = !parse_bool(NO_SANDBOX_ENV_VAR, &flag)?;
        }
        if let Some(n) = get(MAX_CONCURRENT_ENV_VAR) {
            config.max_concurrent = parse_number(MAX_CONCURRENT_ENV_VAR, &n)?.max(1) as usize;
        }
        if let Some(secs) = get(ANALYSIS_TIMEOUT_ENV_VAR) {
            config.analysis_timeout = Duration::from_secs(parse_number(ANALYSIS_TIMEOUT_ENV_VAR, &secs)?);
        }

        Ok(config)
    }

    /// Fail fast when enrichment is on but no credential is configured
    pub fn validate(&self) -> Result<()> {
        if self.enrichment_enabled && self.api_key.is_none() {
            return Err(ConfigError::MissingApiKey(API_KEY_ENV_VAR).into());
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
        .into()),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|_| {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}
