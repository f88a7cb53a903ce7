//! Error types for a11yscan
//!
//! Fatal failures (launch, navigation, missing input or credentials) surface
//! through [`Error`]. Recoverable conditions never reach this type: they are
//! folded into degraded snapshots and reports by the component that saw them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for a11yscan operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Snapshot extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Screenshot errors
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Model call / response errors
    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    /// Configuration and input errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The whole analysis exceeded its time budget
    #[error("Analysis timed out after {0}s")]
    AnalysisTimeout(u64),

    /// No monitor with this id
    #[error("Monitor not found: {0}")]
    MonitorNotFound(String),

    /// Server is shutting down or otherwise cannot accept work
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Launch settings rejected before Chromium started
    #[error("Invalid browser configuration: {0}")]
    InvalidConfig(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),
}

/// Snapshot extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// JavaScript execution failed
    #[error("JavaScript execution failed: {0}")]
    JsExecutionFailed(String),

    /// The in-page result could not be read as a snapshot
    #[error("Snapshot parsing failed: {0}")]
    ParsingFailed(String),
}

/// Screenshot errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Screenshot failed
    #[error("Screenshot capture failed: {0}")]
    ScreenshotFailed(String),
}

/// Errors raised while talking to the narrative model
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// Transport-level failure
    #[error("Model request failed: {0}")]
    Request(String),

    /// Non-success HTTP status
    #[error("Model returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        message: String,
    },

    /// Response carried no text
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// No `{ ... }` object in the response text
    #[error("No JSON object found in model response")]
    NoJson,

    /// JSON object present but unparseable
    #[error("Invalid JSON in model response: {0}")]
    InvalidJson(String),
}

/// Configuration and input errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No URL was supplied
    #[error("URL is required")]
    MissingUrl,

    /// A required request field was absent or blank
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Model credential missing while enrichment is enabled
    #[error("Missing model API key (set {0})")]
    MissingApiKey(&'static str),

    /// A configuration value could not be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Configuration key
        key: String,
        /// Offending value
        value: String,
    },
}

/// Result type alias for a11yscan operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Browser(BrowserError::LaunchFailed(_)) => "BROWSER_LAUNCH_FAILED",
            Error::Browser(BrowserError::InvalidConfig(_)) => "BROWSER_CONFIG_INVALID",
            Error::Browser(_) => "BROWSER_ERROR",
            Error::Navigation(NavigationError::InvalidUrl(_)) => "INVALID_URL",
            Error::Navigation(NavigationError::Timeout(_)) => "NAVIGATION_TIMEOUT",
            Error::Navigation(NavigationError::LoadFailed(_)) => "NAVIGATION_FAILED",
            Error::Extraction(_) => "EXTRACTION_FAILED",
            Error::Capture(_) => "CAPTURE_FAILED",
            Error::Enrichment(_) => "ENRICHMENT_FAILED",
            Error::Config(ConfigError::MissingUrl) => "MISSING_URL",
            Error::Config(ConfigError::MissingField(_)) => "MISSING_FIELD",
            Error::Config(ConfigError::MissingApiKey(_)) => "MISSING_API_KEY",
            Error::Config(ConfigError::InvalidValue { .. }) => "INVALID_CONFIG",
            Error::AnalysisTimeout(_) => "ANALYSIS_TIMEOUT",
            Error::MonitorNotFound(_) => "MONITOR_NOT_FOUND",
            Error::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Error::Io(_) | Error::Json(_) | Error::Cdp(_) | Error::Generic(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller supplied bad input (as opposed to a server-side failure)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Config(ConfigError::MissingUrl)
                | Error::Config(ConfigError::MissingField(_))
                | Error::Navigation(NavigationError::InvalidUrl(_))
                | Error::MonitorNotFound(_)
        )
    }

    /// Troubleshooting hints shown alongside analysis failures
    pub fn hints(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            Error::Browser(_) => &[
                "Check that Chrome or Chromium is installed and reachable (set CHROME_PATH)",
                "In containers, disable the sandbox with A11YSCAN_NO_SANDBOX=1",
            ],
            Error::Navigation(NavigationError::InvalidUrl(_)) | Error::Config(ConfigError::MissingUrl) => &[
                "Provide an absolute URL such as https://example.com",
            ],
            Error::Navigation(_) | Error::AnalysisTimeout(_) => &[
                "Verify the website is online and publicly reachable",
                "Sites behind logins or firewalls cannot be analyzed",
                "Try again later; the site may be slow or rate limiting",
            ],
            Error::Capture(_) | Error::Extraction(_) | Error::Cdp(_) => &[
                "The page may have crashed the renderer; try again",
                "Very large pages can exceed screenshot limits",
            ],
            Error::Config(ConfigError::MissingApiKey(_)) => &[
                "Set GEMINI_API_KEY, or run with --no-ai for a heuristic-only report",
            ],
            _ => &[],
        };
        hints.iter().map(|h| h.to_string()).collect()
    }

    /// Structured, user-facing rendering of this error
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            hints: self.hints(),
        }
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

/// Wire shape of a fatal error: code, message and troubleshooting hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable code
    pub error: String,
    /// Human message
    pub message: String,
    /// Troubleshooting hints (may be empty)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}
