//! # Bot Verification
//!
//! Remote verification of the bot-detection token a form carries. The pipeline only
//! sees the [`BotVerifier`] trait; [`RecaptchaVerifier`] is the production
//! implementation talking to Google's `siteverify` endpoint.
//!
//! The verifier reports what the remote service said. Deciding whether a score is
//! good enough is the pipeline's job, so thresholds live in
//! [`crate::pipeline::PipelineConfig`], not here.

mod recaptcha;

pub use recaptcha::{RecaptchaVerifier, DEFAULT_VERIFY_URL};

use serde::Deserialize;
use std::fmt;

/// Response body of the verification service
///
/// Only `success` is mandatory. v2 checkboxes report no `score`; v3 does.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SiteVerifyResponse {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Outcome of the verification step, carried forward for observability
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub accepted: bool,
    pub confidence_score: Option<f64>,
    pub reason: Option<String>,
}

impl VerificationResult {
    pub fn accepted(score: Option<f64>) -> Self {
        Self {
            accepted: true,
            confidence_score: score,
            reason: None,
        }
    }

    pub fn rejected(score: Option<f64>, reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            confidence_score: score,
            reason: Some(reason.into()),
        }
    }
}

/// Errors talking to the verification service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// No secret configured; verification cannot run
    NotConfigured,
    /// Connection, TLS or timeout failure
    Transport(String),
    /// Service answered with a non-success HTTP status
    Status(u16),
    /// Body was not the expected JSON
    InvalidResponse(String),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::NotConfigured => write!(f, "verification secret is not configured"),
            VerifyError::Transport(e) => write!(f, "verification request failed: {e}"),
            VerifyError::Status(code) => {
                write!(f, "verification service returned HTTP {code}")
            }
            VerifyError::InvalidResponse(e) => {
                write!(f, "verification service returned an invalid response: {e}")
            }
        }
    }
}

impl std::error::Error for VerifyError {}

/// Seam between the pipeline and whatever verifies bot tokens
pub trait BotVerifier: Send + Sync {
    /// Verify one token. A single attempt; callers never retry.
    fn verify(&self, token: &str) -> Result<SiteVerifyResponse, VerifyError>;
}
