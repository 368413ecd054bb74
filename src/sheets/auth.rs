use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use http::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// OAuth scope granting read/write access to spreadsheets
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Google's OAuth 2.0 token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh this long before the token endpoint's stated expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Upper bound on how long a token is served from cache, whatever `expires_in` says
const MAX_CACHE_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors obtaining an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Client email or private key not configured
    MissingCredentials,
    /// Private key is not a usable RSA PEM, or signing failed
    InvalidKey(String),
    /// Connection, TLS or timeout failure
    Transport(String),
    /// Token endpoint answered with a non-success status
    TokenEndpoint { status: u16, message: String },
    /// Body was not the expected JSON
    InvalidResponse(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredentials => {
                write!(f, "service account client email or private key is not configured")
            }
            AuthError::InvalidKey(e) => write!(f, "service account key rejected: {e}"),
            AuthError::Transport(e) => write!(f, "token request failed: {e}"),
            AuthError::TokenEndpoint { status, message } => {
                write!(f, "token endpoint returned HTTP {status}: {message}")
            }
            AuthError::InvalidResponse(e) => {
                write!(f, "token endpoint returned an invalid response: {e}")
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Anything that can hand out a bearer token for the Sheets API
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Result<String, AuthError>;
}

/// Pre-issued bearer token, used as-is
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Service-account credentials exchanged for short-lived access tokens
///
/// Signs an RS256 assertion with the account's private key, trades it at the token
/// endpoint and keeps the result until shortly before it expires. Concurrent callers
/// that miss the cache each perform their own exchange; the last one wins the slot.
pub struct ServiceAccountAuth {
    client_email: Option<String>,
    private_key: Option<String>,
    token_uri: String,
    scope: String,
    client: reqwest::blocking::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Create from a client email and PEM private key
    ///
    /// Literal `\n` sequences in the key (as found in single-line env vars) are
    /// expanded into real newlines.
    pub fn new(
        client_email: Option<String>,
        private_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(Self {
            client_email: client_email.filter(|s| !s.trim().is_empty()),
            private_key: private_key
                .filter(|s| !s.trim().is_empty())
                .map(|k| normalize_private_key(&k)),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            scope: SHEETS_SCOPE.to_string(),
            client,
            cache: Mutex::new(None),
        })
    }

    /// Exchange assertions at a different token endpoint
    pub fn token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = uri.into();
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.client_email.is_some() && self.private_key.is_some()
    }

    /// Build and sign the JWT-bearer assertion for time `now` (unix seconds)
    fn assertion(&self, now: i64) -> Result<String, AuthError> {
        let (email, key) = match (&self.client_email, &self.private_key) {
            (Some(e), Some(k)) => (e, k),
            _ => return Err(AuthError::MissingCredentials),
        };
        let claims = AssertionClaims {
            iss: email,
            scope: &self.scope,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let encoding_key = jsonwebtoken::EncodingKey::from_rsa_pem(key.as_bytes())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &encoding_key,
        )
        .map_err(|e| AuthError::InvalidKey(e.to_string()))
    }

    fn cached(&self) -> Option<String> {
        let guard = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        guard
            .as_ref()
            .filter(|c| Instant::now() < c.refresh_at)
            .map(|c| c.token.clone())
    }

    fn exchange(&self) -> Result<String, AuthError> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();

        let response = self
            .client
            .post(&self.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorBody>(&body)
                .ok()
                .and_then(|b| b.error_description.or(b.error))
                .unwrap_or(body);
            warn!(status = status.as_u16(), %message, "Token exchange rejected");
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let lifetime = Duration::from_secs(parsed.expires_in)
            .min(MAX_CACHE_LIFETIME)
            .saturating_sub(EXPIRY_MARGIN);
        match Instant::now().checked_add(lifetime) {
            Some(refresh_at) => {
                let mut guard = self.cache.lock().unwrap_or_else(|p| p.into_inner());
                *guard = Some(CachedToken {
                    token: parsed.access_token.clone(),
                    refresh_at,
                });
            }
            None => warn!(expires_in = parsed.expires_in, "Token lifetime out of range; not cached"),
        }
        debug!(expires_in = parsed.expires_in, "Obtained sheets access token");
        Ok(parsed.access_token)
    }
}

impl TokenSource for ServiceAccountAuth {
    fn access_token(&self) -> Result<String, AuthError> {
        if !self.has_credentials() {
            return Err(AuthError::MissingCredentials);
        }
        if let Some(token) = self.cached() {
            return Ok(token);
        }
        self.exchange()
    }
}

/// Turn escaped `\n` sequences into newlines so PEM parsing sees real line breaks
pub(crate) fn normalize_private_key(key: &str) -> String {
    key.replace("\\n", "\n")
}
