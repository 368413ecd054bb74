//! Structured logging setup and payload redaction
//!
//! JSON output for production, pretty-print for development, with optional
//! non-blocking stdout writing. Submitted form data is logged for diagnostics, so
//! [`redact_payload`] masks credential-like (and optionally PII-like) fields first.

use anyhow::{Context, Result};
use serde_json::Value;
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::pipeline::FormPayload;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Redaction level for submitted data in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactionLevel {
    /// No redaction (dev only)
    None,
    /// Redact credentials (tokens, secrets, passwords)
    Credentials,
    /// Redact credentials + PII (emails, phones, names)
    Full,
}

impl RedactionLevel {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => RedactionLevel::None,
            "full" => RedactionLevel::Full,
            _ => RedactionLevel::Credentials,
        }
    }

    /// Whether a field with this name should be masked at this level
    pub fn should_redact(&self, field_name: &str) -> bool {
        if *self == RedactionLevel::None {
            return false;
        }
        let name = field_name.to_lowercase();

        const CREDENTIAL_PATTERNS: &[&str] = &[
            "password",
            "passwd",
            "secret",
            "token",
            "api_key",
            "apikey",
            "authorization",
            "credit_card",
            "creditcard",
            "ssn",
        ];
        if CREDENTIAL_PATTERNS.iter().any(|p| name.contains(p)) {
            return true;
        }

        if *self == RedactionLevel::Full {
            const PII_PATTERNS: &[&str] = &["email", "phone", "name", "address"];
            // Too short to match inside words (zip, description)
            const PII_SEGMENTS: &[&str] = &["ip"];
            return PII_PATTERNS.iter().any(|p| name.contains(p))
                || name_segments(field_name)
                    .iter()
                    .any(|seg| PII_SEGMENTS.contains(&seg.as_str()));
        }
        false
    }

    /// Masked rendering of a value (keys and tokens keep their first 4 chars)
    pub fn redact_value(&self, field_name: &str, value: &str) -> String {
        let name = field_name.to_lowercase();
        if value.chars().count() > 4 && (name.contains("key") || name.contains("token")) {
            let prefix: String = value.chars().take(4).collect();
            format!("{prefix}***")
        } else {
            "<REDACTED>".to_string()
        }
    }
}

/// Lowercased segments of a field name, split at `_`, `-`, `.`, spaces and
/// camelCase humps (`clientIp` -> `client`, `ip`)
fn name_segments(field_name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in field_name.chars() {
        if matches!(c, '_' | '-' | '.' | ' ') {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            segments.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Render a payload for logging with sensitive fields masked
///
/// Field order is preserved so the log line matches the row that will be written.
pub fn redact_payload(payload: &FormPayload, level: RedactionLevel) -> String {
    let masked: FormPayload = payload
        .iter()
        .map(|(k, v)| {
            if level.should_redact(k) {
                let shown = match v {
                    Value::String(s) => level.redact_value(k, s),
                    _ => "<REDACTED>".to_string(),
                };
                (k.clone(), Value::String(shown))
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect();
    Value::Object(masked).to_string()
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    /// Log format: json/pretty
    pub format: LogFormat,
    /// Redaction level: none/credentials/full
    pub redact_level: RedactionLevel,
    /// Write through a non-blocking worker thread
    pub async_logging: bool,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from `FORMSHEET_LOG_*` environment variables with defaults
    pub fn from_env() -> Self {
        let prod = Self::default_prod();
        Self {
            log_level: env::var("FORMSHEET_LOG_LEVEL").unwrap_or(prod.log_level),
            format: env::var("FORMSHEET_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(prod.format),
            redact_level: env::var("FORMSHEET_LOG_REDACT_LEVEL")
                .map(|s| RedactionLevel::parse(&s))
                .unwrap_or(prod.redact_level),
            async_logging: env::var("FORMSHEET_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(prod.async_logging),
            include_location: env::var("FORMSHEET_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(prod.include_location),
        }
    }

    /// Verbose, synchronous, human-readable
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            redact_level: RedactionLevel::None,
            async_logging: false,
            include_location: true,
        }
    }

    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            redact_level: RedactionLevel::Credentials,
            async_logging: true,
            include_location: false,
        }
    }
}

fn parse_level(s: &str) -> Level {
    match s.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over `config.log_level` when set. With async logging the returned
/// guard must be held until exit, or buffered lines are lost.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let level = parse_level(&config.log_level);
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    // Client disconnects surface as noisy info/debug lines from the server loop
    if let Ok(directive) = "may_minihttp=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let (writer, guard) = if config.async_logging {
        let (nb, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse_payload;

    #[test]
    fn test_log_config_defaults() {
        let dev = LogConfig::default_dev();
        assert_eq!(dev.format, LogFormat::Pretty);
        assert_eq!(dev.redact_level, RedactionLevel::None);
        assert!(!dev.async_logging);

        let prod = LogConfig::default_prod();
        assert_eq!(prod.log_level, "info");
        assert_eq!(prod.format, LogFormat::Json);
        assert_eq!(prod.redact_level, RedactionLevel::Credentials);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("whatever"), LogFormat::Json);
        assert_eq!(RedactionLevel::parse("full"), RedactionLevel::Full);
        assert_eq!(RedactionLevel::parse("NONE"), RedactionLevel::None);
        assert_eq!(RedactionLevel::parse("bogus"), RedactionLevel::Credentials);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("nope"), Level::INFO);
    }

    #[test]
    fn test_should_redact_levels() {
        let creds = RedactionLevel::Credentials;
        assert!(creds.should_redact("recaptchaToken"));
        assert!(creds.should_redact("password"));
        assert!(!creds.should_redact("email"));

        let full = RedactionLevel::Full;
        assert!(full.should_redact("email"));
        assert!(full.should_redact("firstName"));
        assert!(full.should_redact("phone_number"));

        assert!(!RedactionLevel::None.should_redact("recaptchaToken"));
    }

    #[test]
    fn test_ip_matches_whole_segments_only() {
        let full = RedactionLevel::Full;
        assert!(full.should_redact("ip"));
        assert!(full.should_redact("ip_address"));
        assert!(full.should_redact("client_ip"));
        assert!(full.should_redact("clientIp"));
        assert!(full.should_redact("X-Forwarded-IP"));
        assert!(!full.should_redact("zip"));
        assert!(!full.should_redact("description"));
        assert!(!full.should_redact("recipient"));
        assert!(!full.should_redact("shipping"));
        assert_eq!(name_segments("clientIp"), vec!["client", "ip"]);
        assert_eq!(name_segments("ip_address"), vec!["ip", "address"]);
    }

    #[test]
    fn test_redact_value_truncation() {
        let level = RedactionLevel::Credentials;
        assert_eq!(level.redact_value("recaptchaToken", "abcdefgh"), "abcd***");
        assert_eq!(level.redact_value("token", "abc"), "<REDACTED>");
        assert_eq!(level.redact_value("password", "hunter22"), "<REDACTED>");
    }

    #[test]
    fn test_redact_payload_keeps_order_and_masks() {
        let payload =
            parse_payload(br#"{"name":"Ada","recaptchaToken":"tok-123456","n":1}"#).unwrap();
        let rendered = redact_payload(&payload, RedactionLevel::Credentials);
        assert_eq!(rendered, r#"{"name":"Ada","recaptchaToken":"tok-***","n":1}"#);

        let full = redact_payload(&payload, RedactionLevel::Full);
        assert_eq!(full, r#"{"name":"<REDACTED>","recaptchaToken":"tok-***","n":1}"#);
    }
}
