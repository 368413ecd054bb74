//! # Spreadsheet Append
//!
//! Appending one row per submission to a Google Sheets range.
//!
//! - [`SheetAppender`] is the seam the pipeline calls. Exactly one `append_row` per request.
//! - [`SheetsClient`] implements it against the Sheets v4 REST API.
//! - [`TokenSource`] supplies bearer tokens; [`ServiceAccountAuth`] mints them from a
//!   service-account key using the JWT-bearer grant.

mod auth;
mod client;

pub use auth::{
    AuthError, ServiceAccountAuth, StaticToken, TokenSource, DEFAULT_TOKEN_URI, SHEETS_SCOPE,
};
pub use client::{SheetsClient, DEFAULT_SHEETS_BASE_URL, DEFAULT_RANGE};

use serde_json::Value;
use std::fmt;

/// What the spreadsheet API reported about an append
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// `updates.updatedRows`, or 0 when the API did not report it
    pub updated_rows: u64,
    /// `updates.updatedRange`, e.g. `Sheet1!A7:C7`
    pub updated_range: Option<String>,
}

/// Errors appending a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetsError {
    /// No spreadsheet id configured
    MissingSpreadsheetId,
    /// Could not obtain an access token
    Auth(AuthError),
    /// Connection, TLS or timeout failure
    Transport(String),
    /// API answered with a non-success status
    Api { status: u16, message: String },
    /// Body was not the expected JSON
    InvalidResponse(String),
}

impl fmt::Display for SheetsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetsError::MissingSpreadsheetId => write!(f, "spreadsheet id is not configured"),
            SheetsError::Auth(e) => write!(f, "{e}"),
            SheetsError::Transport(e) => write!(f, "sheets request failed: {e}"),
            SheetsError::Api { status, message } => {
                write!(f, "sheets API returned HTTP {status}: {message}")
            }
            SheetsError::InvalidResponse(e) => {
                write!(f, "sheets API returned an invalid response: {e}")
            }
        }
    }
}

impl std::error::Error for SheetsError {}

impl From<AuthError> for SheetsError {
    fn from(err: AuthError) -> Self {
        SheetsError::Auth(err)
    }
}

/// Seam between the pipeline and the spreadsheet
pub trait SheetAppender: Send + Sync {
    /// Append `row` as a single new row. One call, one attempt.
    fn append_row(&self, row: &[Value]) -> Result<AppendOutcome, SheetsError>;
}
