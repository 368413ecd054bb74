//! # Submission Pipeline
//!
//! The only decision logic in the service. For each `POST /api/submit-form`:
//!
//! 1. Parse the body (JSON, or an urlencoded form post) into a non-empty ordered
//!    payload (fail fast, no network I/O)
//! 2. If enabled, verify the bot token and apply the score threshold
//! 3. Strip the token field
//! 4. Turn the remaining values into one ordered row and append it
//! 5. Report a [`SubmissionOutcome`] or a [`crate::error::FormError`]
//!
//! Transport code never reaches past [`FormSubmissionPipeline::submit`].

mod core;
mod payload;

pub use core::{
    evaluate_verification, FormSubmissionPipeline, PipelineConfig, SubmissionOutcome,
    DEFAULT_SCORE_THRESHOLD, DEFAULT_TOKEN_FIELD,
};
pub use payload::{
    build_row, parse_body, parse_form_urlencoded, parse_payload, strip_field, token_value,
    BodyFormat, FormPayload,
};
