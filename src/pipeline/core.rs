use std::sync::Arc;

use tracing::{error, info, warn};

use super::payload::{build_row, parse_body, strip_field, token_value, BodyFormat, FormPayload};
use crate::error::FormError;
use crate::logging::{redact_payload, RedactionLevel};
use crate::sheets::SheetAppender;
use crate::verify::{BotVerifier, SiteVerifyResponse, VerificationResult};

/// Default minimum verification score
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

/// Default name of the form field carrying the verification token
pub const DEFAULT_TOKEN_FIELD: &str = "recaptchaToken";

/// Knobs of the submission pipeline, fixed at startup
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Require and check a bot-verification token
    pub verification_enabled: bool,
    /// Scores strictly below this are rejected
    pub score_threshold: f64,
    /// Reserved payload key holding the token; never forwarded to the sheet
    pub token_field: String,
    /// How much of the received payload to mask in diagnostic logs
    pub log_redaction: RedactionLevel,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            verification_enabled: true,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            token_field: DEFAULT_TOKEN_FIELD.to_string(),
            log_redaction: RedactionLevel::Credentials,
        }
    }
}

/// Result of one accepted or rejected submission, as reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub accepted: bool,
    pub rows_appended: u64,
    pub error_detail: Option<String>,
}

impl SubmissionOutcome {
    pub fn appended(rows: u64) -> Self {
        Self {
            accepted: true,
            rows_appended: rows,
            error_detail: None,
        }
    }

    pub fn rejected(err: &FormError) -> Self {
        Self {
            accepted: false,
            rows_appended: 0,
            error_detail: err.detail(),
        }
    }
}

/// Apply the score policy to a verifier response
///
/// `success == false` rejects. A score below `threshold` rejects; a score equal to it
/// passes. Non-finite scores reject. A successful response without a score (v2
/// checkbox keys) passes with no score recorded.
pub fn evaluate_verification(response: &SiteVerifyResponse, threshold: f64) -> VerificationResult {
    if !response.success {
        let reason = if response.error_codes.is_empty() {
            "verification service rejected the token".to_string()
        } else {
            format!(
                "verification service rejected the token ({})",
                response.error_codes.join(", ")
            )
        };
        return VerificationResult::rejected(response.score, reason);
    }
    match response.score {
        Some(score) if !score.is_finite() || score < threshold => VerificationResult::rejected(
            Some(score),
            format!("score {score} is below threshold {threshold}; likely automated"),
        ),
        score => VerificationResult::accepted(score),
    }
}

/// Validate, verify, filter and append one form submission
///
/// Linear, stateless and safe to share across coroutines: each call touches only
/// its own payload plus the two injected collaborators. Verification always
/// completes before the append starts.
pub struct FormSubmissionPipeline {
    config: PipelineConfig,
    verifier: Arc<dyn BotVerifier>,
    sheets: Arc<dyn SheetAppender>,
}

impl FormSubmissionPipeline {
    pub fn new(
        config: PipelineConfig,
        verifier: Arc<dyn BotVerifier>,
        sheets: Arc<dyn SheetAppender>,
    ) -> Self {
        Self {
            config,
            verifier,
            sheets,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one JSON submission from raw body bytes to appended row
    pub fn submit(&self, body: &[u8]) -> Result<SubmissionOutcome, FormError> {
        self.submit_as(body, BodyFormat::Json)
    }

    /// Run one submission whose body is encoded as `format`
    pub fn submit_as(
        &self,
        body: &[u8],
        format: BodyFormat,
    ) -> Result<SubmissionOutcome, FormError> {
        let payload = parse_body(body, format).map_err(|e| {
            info!(?format, "Rejected submission without form data");
            e
        })?;

        info!(
            field_count = payload.len(),
            form_data = %redact_payload(&payload, self.config.log_redaction),
            "Received form data"
        );

        if self.config.verification_enabled {
            let verdict = self.verify(&payload)?;
            info!(
                score = ?verdict.confidence_score,
                "Verification accepted"
            );
        }

        let filtered = strip_field(payload, &self.config.token_field);
        let row = build_row(&filtered);

        let appended = self.sheets.append_row(&row).map_err(|e| {
            error!(error = %e, "Error submitting form data");
            FormError::from(e)
        })?;

        Ok(SubmissionOutcome::appended(appended.updated_rows))
    }

    fn verify(&self, payload: &FormPayload) -> Result<VerificationResult, FormError> {
        let token = token_value(payload, &self.config.token_field).ok_or_else(|| {
            warn!(field = %self.config.token_field, "Verification token missing");
            FormError::VerificationRejected {
                reason: "verification token is missing".to_string(),
                score: None,
            }
        })?;

        let response = self.verifier.verify(token).map_err(|e| {
            error!(error = %e, "Verification call failed");
            FormError::from(e)
        })?;

        let verdict = evaluate_verification(&response, self.config.score_threshold);
        if !verdict.accepted {
            let reason = verdict
                .reason
                .clone()
                .unwrap_or_else(|| "verification rejected".to_string());
            warn!(
                score = ?verdict.confidence_score,
                threshold = self.config.score_threshold,
                %reason,
                "Verification rejected"
            );
            return Err(FormError::VerificationRejected {
                reason,
                score: verdict.confidence_score,
            });
        }
        Ok(verdict)
    }
}
