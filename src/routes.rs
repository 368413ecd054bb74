//! # Routing
//!
//! Transport-neutral request handling shared by the standalone server and the
//! serverless adapter. Each adapter turns its native request into an
//! [`IncomingRequest`], calls [`FormApp::handle`], and writes the returned
//! [`ApiResponse`] back out.
//!
//! | Method    | Path               | Route                         |
//! |-----------|--------------------|-------------------------------|
//! | `POST`    | `/api/submit-form` | [`Route::SubmitForm`]         |
//! | `GET`     | `/api/health`      | [`Route::Health`]             |
//! | `GET`     | `/`                | [`Route::Root`]               |
//! | `OPTIONS` | any                | [`Route::Preflight`]          |
//! | other     | known path         | [`Route::MethodNotAllowed`]   |
//! | any       | unknown path       | [`Route::NotFound`]           |

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{info, info_span, warn};
use ulid::Ulid;

use crate::config::AppConfig;
use crate::cors::{CorsPolicy, StaticHeader, CONTENT_TYPE_JSON};
use crate::logging::RedactionLevel;
use crate::pipeline::{BodyFormat, FormSubmissionPipeline, SubmissionOutcome};
use crate::sheets::{ServiceAccountAuth, SheetsClient};
use crate::verify::RecaptchaVerifier;

pub const SUBMIT_PATH: &str = "/api/submit-form";
pub const HEALTH_PATH: &str = "/api/health";
pub const ROOT_PATH: &str = "/";

const SUBMIT_SUCCESS_MESSAGE: &str = "Form data successfully added to Google Sheets";
const HEALTH_MESSAGE: &str = "Form submission service is healthy";
const ROOT_MESSAGE: &str = "Form submission service is running";

const ALLOW_POST: StaticHeader =
    StaticHeader::constant("Allow", "POST, OPTIONS", "Allow: POST, OPTIONS");
const ALLOW_GET: StaticHeader = StaticHeader::constant("Allow", "GET, OPTIONS", "Allow: GET, OPTIONS");

/// Where a request is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SubmitForm,
    Health,
    Root,
    Preflight,
    /// Known path, wrong method; carries the `Allow` header for that path
    MethodNotAllowed(StaticHeader),
    NotFound,
}

/// Strip the query string and any trailing slash (`/` itself stays `/`)
pub fn normalize_path(raw: &str) -> &str {
    let path = raw.split(['?', '#']).next().unwrap_or(ROOT_PATH);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT_PATH
    } else {
        trimmed
    }
}

/// Resolve a method and raw request target to a [`Route`]
pub fn resolve_route(method: &str, raw_path: &str) -> Route {
    if method.eq_ignore_ascii_case("OPTIONS") {
        return Route::Preflight;
    }
    let is_get = method.eq_ignore_ascii_case("GET");
    match normalize_path(raw_path) {
        SUBMIT_PATH if method.eq_ignore_ascii_case("POST") => Route::SubmitForm,
        SUBMIT_PATH => Route::MethodNotAllowed(ALLOW_POST),
        HEALTH_PATH if is_get => Route::Health,
        ROOT_PATH if is_get => Route::Root,
        HEALTH_PATH | ROOT_PATH => Route::MethodNotAllowed(ALLOW_GET),
        _ => Route::NotFound,
    }
}

/// Transport-neutral request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingRequest {
    pub method: String,
    /// Request target as received, query string included
    pub path: String,
    /// `Origin` header, when present
    pub origin: Option<String>,
    /// `Content-Type` header, when present; selects JSON or urlencoded parsing
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Transport-neutral response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<StaticHeader>,
    /// `None` for preflight responses, which have an empty body
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: vec![CONTENT_TYPE_JSON],
            body: Some(body),
        }
    }

    /// Empty-bodied response (preflight)
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: vec![CONTENT_TYPE_JSON],
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = StaticHeader>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// First value of header `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&'static str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value)
    }

    /// Serialized body bytes; empty for bodiless responses
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            Some(v) => v.to_string().into_bytes(),
            None => Vec::new(),
        }
    }
}

/// JSON body reporting a submission outcome under `message`
///
/// Accepted outcomes carry `updatedRows`; rejected ones carry `error` when there is
/// a diagnostic detail.
pub fn submission_body(outcome: &SubmissionOutcome, message: &str) -> Value {
    if outcome.accepted {
        return json!({
            "success": true,
            "message": message,
            "updatedRows": outcome.rows_appended,
        });
    }
    let mut body = json!({
        "success": false,
        "message": message,
    });
    if let (Some(detail), Some(obj)) = (&outcome.error_detail, body.as_object_mut()) {
        obj.insert("error".to_string(), Value::String(detail.clone()));
    }
    body
}


/// Liveness payload with the current time as RFC 3339
pub fn health_body() -> Value {
    json!({
        "success": true,
        "message": HEALTH_MESSAGE,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Fixed description of the available operations
pub fn root_body() -> Value {
    json!({
        "success": true,
        "message": ROOT_MESSAGE,
        "endpoints": {
            "healthCheck": format!("GET {HEALTH_PATH}"),
            "submitForm": format!("POST {SUBMIT_PATH}"),
        }
    })
}

/// The form service: one pipeline plus its CORS policy
#[derive(Clone)]
pub struct FormApp {
    pipeline: Arc<FormSubmissionPipeline>,
    cors: Arc<CorsPolicy>,
}

impl FormApp {
    pub fn new(pipeline: FormSubmissionPipeline, cors: CorsPolicy) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            cors: Arc::new(cors),
        }
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(config: &AppConfig, log_redaction: RedactionLevel) -> anyhow::Result<Self> {
        let timeout = config.http_timeout();

        let verifier = RecaptchaVerifier::new(config.recaptcha_secret_key.clone(), timeout)
            .context("Failed to build verification client")?
            .verify_url(config.recaptcha_verify_url.clone());

        let auth = ServiceAccountAuth::new(
            config.google_client_email.clone(),
            config.google_private_key.clone(),
            timeout,
        )
        .context("Failed to build token client")?
        .token_uri(config.google_token_uri.clone());

        let sheets = SheetsClient::new(config.google_spreadsheet_id.clone(), Arc::new(auth), timeout)
            .context("Failed to build sheets client")?
            .range(config.google_sheet_range.clone())
            .base_url(config.google_sheets_base_url.clone());

        for warning in config.warnings() {
            warn!("{warning}");
        }

        let pipeline = FormSubmissionPipeline::new(
            config.pipeline_config(log_redaction),
            Arc::new(verifier),
            Arc::new(sheets),
        );
        Ok(Self::new(pipeline, config.cors_policy()))
    }

    pub fn pipeline(&self) -> &FormSubmissionPipeline {
        &self.pipeline
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    /// Handle one request end to end. Never fails: every error becomes a JSON body.
    pub fn handle(&self, req: &IncomingRequest) -> ApiResponse {
        let request_id = Ulid::new();
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %req.method,
            path = %req.path
        );
        let _enter = span.enter();
        let start = Instant::now();

        let route = resolve_route(&req.method, &req.path);
        let origin = req.origin.as_deref();

        let response = match route {
            Route::Preflight => {
                let preflight =
                    ApiResponse::empty(204).with_headers(self.cors.preflight_headers(origin));
                return self.finish(preflight, start);
            }
            Route::SubmitForm => self.submit(req),
            Route::Health => ApiResponse::json(200, health_body()),
            Route::Root => ApiResponse::json(200, root_body()),
            Route::MethodNotAllowed(allow) => ApiResponse::json(
                405,
                json!({"success": false, "message": "Method not allowed"}),
            )
            .with_headers([allow]),
            Route::NotFound => {
                ApiResponse::json(404, json!({"success": false, "message": "Not found"}))
            }
        };

        self.finish(response.with_headers(self.cors.response_headers(origin)), start)
    }

    fn submit(&self, req: &IncomingRequest) -> ApiResponse {
        let format = BodyFormat::from_content_type(req.content_type.as_deref());
        let (status, message, outcome) = match self.pipeline.submit_as(&req.body, format) {
            Ok(outcome) => (200, SUBMIT_SUCCESS_MESSAGE.to_string(), outcome),
            Err(err) => (err.status(), err.message(), SubmissionOutcome::rejected(&err)),
        };
        ApiResponse::json(status, submission_body(&outcome, &message))
    }

    fn finish(&self, response: ApiResponse, start: Instant) -> ApiResponse {
        info!(
            status = response.status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        response
    }
}
