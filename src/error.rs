use std::fmt;

use crate::sheets::SheetsError;
use crate::verify::VerifyError;

/// Failure exits of the submission pipeline
///
/// Every variant maps onto exactly one HTTP status via [`FormError::status`].
/// Nothing here is retried; the request boundary turns each one into a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    /// Body missing, unparsable, not a JSON object, or an empty object
    InvalidInput,
    /// Token missing, verifier said no, or score below threshold
    VerificationRejected {
        /// Human-readable rejection reason
        reason: String,
        /// Score reported by the verifier, when there was one
        score: Option<f64>,
    },
    /// Verification is enabled but the server has no secret to verify with
    VerificationUnavailable {
        /// Which piece of configuration is missing
        reason: String,
    },
    /// Network, timeout or API error from the verifier or the spreadsheet API
    Upstream {
        /// Which collaborator failed (`verification` or `sheets`)
        service: &'static str,
        /// Underlying error text, surfaced to the caller for diagnostics
        detail: String,
    },
}

impl FormError {
    /// HTTP status for this failure: client errors are 400, upstream failures 500
    pub fn status(&self) -> u16 {
        match self {
            FormError::InvalidInput
            | FormError::VerificationRejected { .. }
            | FormError::VerificationUnavailable { .. } => 400,
            FormError::Upstream { .. } => 500,
        }
    }

    /// Caller-facing message placed in the response `message` field
    pub fn message(&self) -> String {
        match self {
            FormError::InvalidInput => "No form data provided".to_string(),
            FormError::VerificationRejected { reason, .. } => {
                format!("Verification failed: {reason}")
            }
            FormError::VerificationUnavailable { reason } => {
                format!("Verification unavailable: {reason}")
            }
            FormError::Upstream { .. } => "Failed to submit form data".to_string(),
        }
    }

    /// Diagnostic detail placed in the response `error` field, if any
    pub fn detail(&self) -> Option<String> {
        match self {
            FormError::Upstream { detail, .. } => Some(detail.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::InvalidInput => write!(f, "no form data provided"),
            FormError::VerificationRejected { reason, .. } => {
                write!(f, "verification rejected: {reason}")
            }
            FormError::VerificationUnavailable { reason } => {
                write!(f, "verification unavailable: {reason}")
            }
            FormError::Upstream { service, detail } => {
                write!(f, "{service} upstream failure: {detail}")
            }
        }
    }
}

impl std::error::Error for FormError {}

impl From<VerifyError> for FormError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::NotConfigured => FormError::VerificationUnavailable {
                reason: "verification secret is not configured".to_string(),
            },
            other => FormError::Upstream {
                service: "verification",
                detail: other.to_string(),
            },
        }
    }
}

impl From<SheetsError> for FormError {
    fn from(err: SheetsError) -> Self {
        FormError::Upstream {
            service: "sheets",
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(FormError::InvalidInput.status(), 400);
        assert_eq!(
            FormError::VerificationRejected {
                reason: "low score".into(),
                score: Some(0.1)
            }
            .status(),
            400
        );
        assert_eq!(
            FormError::VerificationUnavailable {
                reason: "no secret".into()
            }
            .status(),
            400
        );
        assert_eq!(
            FormError::Upstream {
                service: "sheets",
                detail: "boom".into()
            }
            .status(),
            500
        );
    }

    #[test]
    fn test_invalid_input_message() {
        assert_eq!(FormError::InvalidInput.message(), "No form data provided");
        assert_eq!(FormError::InvalidInput.detail(), None);
    }

    #[test]
    fn test_not_configured_maps_to_unavailable() {
        let err: FormError = VerifyError::NotConfigured.into();
        assert!(matches!(err, FormError::VerificationUnavailable { .. }));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_transport_maps_to_upstream() {
        let err: FormError = VerifyError::Transport("connection refused".into()).into();
        assert_eq!(err.status(), 500);
        assert_eq!(err.message(), "Failed to submit form data");
        assert!(err.detail().unwrap_or_default().contains("connection refused"));
    }
}
