//! # Service Configuration
//!
//! [`AppConfig`] is built once at startup and handed to everything that needs it.
//! Sources, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. An optional config file (YAML, TOML or JSON, chosen by extension)
//! 3. Environment variables (`GOOGLE_SPREADSHEET_ID`, `RECAPTCHA_SECRET_KEY`, `PORT`, ...)
//!
//! Missing Google credentials or a missing reCAPTCHA secret do not stop the service
//! from starting. Health probes keep working and submissions fail with a logged
//! error until the deployment is fixed.

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cors::CorsPolicy;
use crate::logging::RedactionLevel;
use crate::pipeline::{PipelineConfig, DEFAULT_SCORE_THRESHOLD, DEFAULT_TOKEN_FIELD};
use crate::sheets::{DEFAULT_RANGE, DEFAULT_SHEETS_BASE_URL, DEFAULT_TOKEN_URI};
use crate::verify::DEFAULT_VERIFY_URL;

/// Errors loading or validating configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A source could not be read or deserialized
    Load(String),
    /// A value was read but is out of range or malformed
    Invalid { key: &'static str, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(e) => write!(f, "failed to load configuration: {e}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "invalid configuration value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

fn default_range() -> String {
    DEFAULT_RANGE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    DEFAULT_SCORE_THRESHOLD
}

fn default_token_field() -> String {
    DEFAULT_TOKEN_FIELD.to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_verify_url() -> String {
    DEFAULT_VERIFY_URL.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_sheets_base_url() -> String {
    DEFAULT_SHEETS_BASE_URL.to_string()
}

/// Everything the service reads at startup
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub google_spreadsheet_id: Option<String>,
    #[serde(default = "default_range")]
    pub google_sheet_range: String,
    #[serde(default)]
    pub google_client_email: Option<String>,
    #[serde(default)]
    pub google_private_key: Option<String>,

    #[serde(default = "default_true")]
    pub recaptcha_enabled: bool,
    #[serde(default)]
    pub recaptcha_secret_key: Option<String>,
    #[serde(default = "default_threshold")]
    pub recaptcha_score_threshold: f64,
    #[serde(default = "default_token_field")]
    pub recaptcha_token_field: String,

    /// Comma-separated origins; unset, empty or `*` allows any origin
    #[serde(default)]
    pub allowed_origins: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_timeout_ms")]
    pub http_timeout_ms: u64,

    #[serde(default = "default_verify_url")]
    pub recaptcha_verify_url: String,
    #[serde(default = "default_token_uri")]
    pub google_token_uri: String,
    #[serde(default = "default_sheets_base_url")]
    pub google_sheets_base_url: String,
}

// Secrets never reach Debug output
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("google_spreadsheet_id", &self.google_spreadsheet_id)
            .field("google_sheet_range", &self.google_sheet_range)
            .field("google_client_email", &self.google_client_email)
            .field("google_private_key", &self.google_private_key.as_ref().map(|_| "<REDACTED>"))
            .field("recaptcha_enabled", &self.recaptcha_enabled)
            .field("recaptcha_secret_key", &self.recaptcha_secret_key.as_ref().map(|_| "<REDACTED>"))
            .field("recaptcha_score_threshold", &self.recaptcha_score_threshold)
            .field("recaptcha_token_field", &self.recaptcha_token_field)
            .field("allowed_origins", &self.allowed_origins)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("http_timeout_ms", &self.http_timeout_ms)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_spreadsheet_id: None,
            google_sheet_range: default_range(),
            google_client_email: None,
            google_private_key: None,
            recaptcha_enabled: true,
            recaptcha_secret_key: None,
            recaptcha_score_threshold: DEFAULT_SCORE_THRESHOLD,
            recaptcha_token_field: default_token_field(),
            allowed_origins: None,
            port: default_port(),
            host: default_host(),
            http_timeout_ms: default_timeout_ms(),
            recaptcha_verify_url: default_verify_url(),
            google_token_uri: default_token_uri(),
            google_sheets_base_url: default_sheets_base_url(),
        }
    }
}

impl AppConfig {
    /// Load from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, None)
    }

    /// Load from an optional file plus `env`, or the process environment when `None`
    ///
    /// Environment keys are matched case-insensitively against field names, so
    /// `RECAPTCHA_SCORE_THRESHOLD` sets `recaptcha_score_threshold`.
    pub fn load_from(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::default().source(env));

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would make the service behave nonsensically
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.recaptcha_score_threshold;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::Invalid {
                key: "recaptcha_score_threshold",
                message: format!("{t} is outside [0, 1]"),
            });
        }
        if self.recaptcha_token_field.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "recaptcha_token_field",
                message: "must not be empty".to_string(),
            });
        }
        if self.google_sheet_range.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "google_sheet_range",
                message: "must not be empty".to_string(),
            });
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "http_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Address the standalone server listens on
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                key: "host",
                message: format!("'{}' is not an IP address: {e}", self.host),
            })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn pipeline_config(&self, log_redaction: RedactionLevel) -> PipelineConfig {
        PipelineConfig {
            verification_enabled: self.recaptcha_enabled,
            score_threshold: self.recaptcha_score_threshold,
            token_field: self.recaptcha_token_field.clone(),
            log_redaction,
        }
    }

    /// Origin allow-list, or `None` for any origin
    pub fn origin_list(&self) -> Option<Vec<String>> {
        let raw = self.allowed_origins.as_deref()?.trim();
        if raw.is_empty() || raw == "*" {
            return None;
        }
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() {
            None
        } else {
            Some(origins)
        }
    }

    pub fn cors_policy(&self) -> CorsPolicy {
        match self.origin_list() {
            Some(origins) => CorsPolicy::exact(origins),
            None => CorsPolicy::wildcard(),
        }
    }

    /// Problems that let the service start but will fail submissions
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if is_blank(&self.google_spreadsheet_id) {
            warnings.push("GOOGLE_SPREADSHEET_ID is not set; submissions will fail".to_string());
        }
        if is_blank(&self.google_client_email) || is_blank(&self.google_private_key) {
            warnings.push(
                "GOOGLE_CLIENT_EMAIL or GOOGLE_PRIVATE_KEY is not set; submissions will fail"
                    .to_string(),
            );
        }
        if self.recaptcha_enabled && is_blank(&self.recaptcha_secret_key) {
            warnings.push(
                "RECAPTCHA_SECRET_KEY is not set; verification is unavailable and submissions will be rejected"
                    .to_string(),
            );
        }
        if !self.recaptcha_enabled {
            warnings.push("reCAPTCHA verification is disabled".to_string());
        }
        warnings
    }

    /// Human-readable summary with secrets reduced to set/unset
    pub fn summary(&self) -> String {
        let set = |v: &Option<String>| if is_blank(v) { "unset" } else { "set" };
        let origins = match self.origin_list() {
            Some(list) => list.join(", "),
            None => "*".to_string(),
        };
        format!(
            "spreadsheet id:      {}\n\
             sheet range:         {}\n\
             client email:        {}\n\
             private key:         {}\n\
             recaptcha enabled:   {}\n\
             recaptcha secret:    {}\n\
             score threshold:     {}\n\
             token field:         {}\n\
             allowed origins:     {}\n\
             listen address:      {}:{}\n\
             http timeout:        {} ms",
            self.google_spreadsheet_id.as_deref().unwrap_or("unset"),
            self.google_sheet_range,
            self.google_client_email.as_deref().unwrap_or("unset"),
            set(&self.google_private_key),
            self.recaptcha_enabled,
            set(&self.recaptcha_secret_key),
            self.recaptcha_score_threshold,
            self.recaptcha_token_field,
            origins,
            self.host,
            self.port,
            self.http_timeout_ms,
        )
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map(str::trim).is_none_or(str::is_empty)
}
