//! # CORS
//!
//! Cross-origin headers for browser form posts. The policy is fixed at startup, so
//! every header it can emit is built once and shared as `&'static str`: the
//! `may_minihttp` response writer only accepts static header lines.
//!
//! - Preflight (`OPTIONS`): `204` with allow-origin (when matched), allow-methods,
//!   allow-headers and max-age
//! - Everything else: allow-origin only when the request origin is allowed, plus
//!   `Vary: Origin` for exact allow-lists
//!
//! A disallowed origin is not an error. The request is still processed; the browser
//! simply won't expose the response.

use tracing::debug;

/// A response header whose text lives for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHeader {
    pub name: &'static str,
    pub value: &'static str,
    /// `"Name: value"`, ready for the raw response writer
    pub line: &'static str,
}

impl StaticHeader {
    /// Header from compile-time constants
    pub const fn constant(name: &'static str, value: &'static str, line: &'static str) -> Self {
        Self { name, value, line }
    }

    /// Header from runtime text, leaked once at startup
    pub fn intern(name: &'static str, value: &str) -> Self {
        let value: &'static str = Box::leak(value.to_string().into_boxed_str());
        let line: &'static str = Box::leak(format!("{name}: {value}").into_boxed_str());
        Self { name, value, line }
    }
}

pub const CONTENT_TYPE_JSON: StaticHeader =
    StaticHeader::constant("Content-Type", "application/json", "Content-Type: application/json");

const VARY_ORIGIN: StaticHeader = StaticHeader::constant("Vary", "Origin", "Vary: Origin");

const ALLOW_ANY_ORIGIN: StaticHeader = StaticHeader::constant(
    "Access-Control-Allow-Origin",
    "*",
    "Access-Control-Allow-Origin: *",
);

/// Default preflight cache lifetime in seconds
pub const DEFAULT_MAX_AGE: u32 = 86_400;

/// Origin validation strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginValidation {
    /// Exact string matching against an allow-list
    Exact(Vec<String>),
    /// Any origin
    Wildcard,
}

impl OriginValidation {
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            OriginValidation::Exact(origins) => origins.iter().any(|o| o == origin),
            OriginValidation::Wildcard => true,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, OriginValidation::Wildcard)
    }
}

/// Cross-origin policy applied to every response
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    validation: OriginValidation,
    // Parallel to the Exact list
    origin_headers: Vec<StaticHeader>,
    allow_methods: StaticHeader,
    allow_headers: StaticHeader,
    max_age: StaticHeader,
}

impl CorsPolicy {
    /// Allow any origin (`Access-Control-Allow-Origin: *`)
    pub fn wildcard() -> Self {
        Self::with_validation(OriginValidation::Wildcard, DEFAULT_MAX_AGE)
    }

    /// Allow only the listed origins, compared exactly
    pub fn exact(origins: Vec<String>) -> Self {
        Self::with_validation(OriginValidation::Exact(origins), DEFAULT_MAX_AGE)
    }

    pub fn with_validation(validation: OriginValidation, max_age: u32) -> Self {
        let origin_headers = match &validation {
            OriginValidation::Exact(origins) => origins
                .iter()
                .map(|o| StaticHeader::intern("Access-Control-Allow-Origin", o))
                .collect(),
            OriginValidation::Wildcard => Vec::new(),
        };
        Self {
            validation,
            origin_headers,
            allow_methods: StaticHeader::constant(
                "Access-Control-Allow-Methods",
                "GET, POST, OPTIONS",
                "Access-Control-Allow-Methods: GET, POST, OPTIONS",
            ),
            allow_headers: StaticHeader::constant(
                "Access-Control-Allow-Headers",
                "Content-Type",
                "Access-Control-Allow-Headers: Content-Type",
            ),
            max_age: StaticHeader::intern("Access-Control-Max-Age", &max_age.to_string()),
        }
    }

    pub fn validation(&self) -> &OriginValidation {
        &self.validation
    }

    /// Allow-origin header for this request, if its origin is allowed
    fn allow_origin(&self, origin: Option<&str>) -> Option<StaticHeader> {
        match &self.validation {
            OriginValidation::Wildcard => Some(ALLOW_ANY_ORIGIN),
            OriginValidation::Exact(origins) => {
                let origin = origin?;
                let idx = origins.iter().position(|o| o == origin);
                if idx.is_none() {
                    debug!(origin, "Origin not in allow-list; omitting CORS headers");
                }
                idx.and_then(|i| self.origin_headers.get(i).copied())
            }
        }
    }

    /// Headers for a normal (non-preflight) response
    pub fn response_headers(&self, origin: Option<&str>) -> Vec<StaticHeader> {
        let mut headers = Vec::with_capacity(2);
        if let Some(h) = self.allow_origin(origin) {
            headers.push(h);
        }
        if !self.validation.is_wildcard() {
            headers.push(VARY_ORIGIN);
        }
        headers
    }

    /// Headers for a preflight response
    pub fn preflight_headers(&self, origin: Option<&str>) -> Vec<StaticHeader> {
        let mut headers = self.response_headers(origin);
        headers.push(self.allow_methods);
        headers.push(self.allow_headers);
        headers.push(self.max_age);
        headers
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::wildcard()
    }
}
