use std::time::Duration;

use http::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::{BotVerifier, SiteVerifyResponse, VerifyError};

/// Google's public reCAPTCHA verification endpoint
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// reCAPTCHA `siteverify` client
///
/// Posts `secret` and `response` as a urlencoded form and parses the JSON verdict.
/// The blocking client is built once and reused across requests; each call is bounded
/// by the configured timeout.
///
/// # Usage
///
/// ```rust,no_run
/// use formsheet::verify::{BotVerifier, RecaptchaVerifier};
/// use std::time::Duration;
///
/// let verifier = RecaptchaVerifier::new(Some("server-secret".into()), Duration::from_secs(5))
///     .expect("http client");
/// let verdict = verifier.verify("token-from-browser");
/// ```
pub struct RecaptchaVerifier {
    verify_url: String,
    secret: Option<String>,
    client: reqwest::blocking::Client,
}

impl RecaptchaVerifier {
    /// Create a verifier against [`DEFAULT_VERIFY_URL`]
    ///
    /// A `None` secret is allowed here so the service can start; every
    /// [`verify`](BotVerifier::verify) call then fails with
    /// [`VerifyError::NotConfigured`].
    pub fn new(secret: Option<String>, timeout: Duration) -> Result<Self, VerifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerifyError::Transport(e.to_string()))?;
        Ok(Self {
            verify_url: DEFAULT_VERIFY_URL.to_string(),
            secret: secret.filter(|s| !s.trim().is_empty()),
            client,
        })
    }

    /// Point the verifier at a different endpoint (tests, enterprise proxies)
    pub fn verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}

impl BotVerifier for RecaptchaVerifier {
    fn verify(&self, token: &str) -> Result<SiteVerifyResponse, VerifyError> {
        let secret = self.secret.as_deref().ok_or(VerifyError::NotConfigured)?;

        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("secret", secret)
            .append_pair("response", token)
            .finish();

        let response = self
            .client
            .post(&self.verify_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .map_err(|e| {
                warn!(error = %e, "Verification request failed");
                VerifyError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Verification service returned error status");
            return Err(VerifyError::Status(status.as_u16()));
        }

        let parsed: SiteVerifyResponse = response
            .json()
            .map_err(|e| VerifyError::InvalidResponse(e.to_string()))?;

        debug!(
            success = parsed.success,
            score = ?parsed.score,
            action = ?parsed.action,
            error_codes = ?parsed.error_codes,
            "Verification service responded"
        );
        Ok(parsed)
    }
}
