use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{AppendOutcome, SheetAppender, SheetsError, TokenSource};

/// Sheets v4 REST root
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Range new rows are appended to when none is configured
pub const DEFAULT_RANGE: &str = "Sheet1!A:Z";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_rows: Option<u64>,
    #[serde(default)]
    updated_range: Option<String>,
}

/// Google Sheets `values.append` client
///
/// Sends `valueInputOption=USER_ENTERED` so the sheet infers numbers, dates and
/// formulas from the submitted values the same way it would for typed input.
pub struct SheetsClient {
    base_url: String,
    spreadsheet_id: Option<String>,
    range: String,
    tokens: Arc<dyn TokenSource>,
    client: reqwest::blocking::Client,
}

impl SheetsClient {
    pub fn new(
        spreadsheet_id: Option<String>,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, SheetsError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SheetsError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.filter(|s| !s.trim().is_empty()),
            range: DEFAULT_RANGE.to_string(),
            tokens,
            client,
        })
    }

    /// Target A1 range, e.g. `Responses!A:F`
    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    /// Talk to a different API root (tests, private endpoints)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Full append URL for the configured spreadsheet and range
    pub fn append_url(&self) -> Result<String, SheetsError> {
        let id = self
            .spreadsheet_id
            .as_deref()
            .ok_or(SheetsError::MissingSpreadsheetId)?;
        Ok(format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(id),
            urlencoding::encode(&self.range),
        ))
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

impl SheetAppender for SheetsClient {
    fn append_row(&self, row: &[Value]) -> Result<AppendOutcome, SheetsError> {
        let url = self.append_url()?;
        let token = self.tokens.access_token()?;

        let body = json!({
            "range": self.range,
            "majorDimension": "ROWS",
            "values": [row],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = api_error_message(&text);
            warn!(status = status.as_u16(), %message, "Sheets append rejected");
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AppendResponse = if text.trim().is_empty() {
            AppendResponse::default()
        } else {
            serde_json::from_str(&text).map_err(|e| SheetsError::InvalidResponse(e.to_string()))?
        };
        let updates = parsed.updates.unwrap_or_default();
        let outcome = AppendOutcome {
            updated_rows: updates.updated_rows.unwrap_or(0),
            updated_range: updates.updated_range,
        };

        info!(
            updated_rows = outcome.updated_rows,
            updated_range = ?outcome.updated_range,
            "Sheets API response"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::StaticToken;

    fn client(id: Option<&str>) -> SheetsClient {
        SheetsClient::new(
            id.map(String::from),
            Arc::new(StaticToken("t".into())),
            Duration::from_millis(200),
        )
        .unwrap()
    }

    #[test]
    fn test_append_url_encodes_range() {
        let c = client(Some("abc123")).base_url("https://sheets.example.com/");
        assert_eq!(
            c.append_url().unwrap(),
            "https://sheets.example.com/v4/spreadsheets/abc123/values/Sheet1%21A%3AZ:append?valueInputOption=USER_ENTERED"
        );
    }

    #[test]
    fn test_missing_spreadsheet_id() {
        let c = client(None);
        assert_eq!(c.append_url(), Err(SheetsError::MissingSpreadsheetId));
        assert_eq!(
            c.append_row(&[json!("x")]),
            Err(SheetsError::MissingSpreadsheetId)
        );
    }

    #[test]
    fn test_api_error_message_extraction() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(api_error_message(body), "The caller does not have permission");
        assert_eq!(api_error_message("plain text"), "plain text");
    }
}
