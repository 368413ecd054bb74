use serde_json::{Map, Value};
use tracing::debug;

use crate::error::FormError;

/// Submitted form fields in the order the client sent them
///
/// Backed by serde_json's order-preserving map, so iteration order is insertion
/// order and therefore spreadsheet column order.
pub type FormPayload = Map<String, Value>;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Encoding of a submission body, chosen from the request `Content-Type`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyFormat {
    #[default]
    Json,
    /// HTML form posts (`application/x-www-form-urlencoded`)
    UrlEncoded,
}

impl BodyFormat {
    /// Anything other than a urlencoded media type is read as JSON
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .unwrap_or_default();
        if essence.eq_ignore_ascii_case(FORM_URLENCODED) {
            BodyFormat::UrlEncoded
        } else {
            BodyFormat::Json
        }
    }
}

/// Parse a raw request body in the given format into a non-empty payload
pub fn parse_body(body: &[u8], format: BodyFormat) -> Result<FormPayload, FormError> {
    match format {
        BodyFormat::Json => parse_payload(body),
        BodyFormat::UrlEncoded => parse_form_urlencoded(body),
    }
}

/// Parse an urlencoded form body into a non-empty payload
///
/// Values are strings. A key that repeats collects its values into an array at the
/// position of its first occurrence. Bracketed keys (`a[b]`) are taken literally.
pub fn parse_form_urlencoded(body: &[u8]) -> Result<FormPayload, FormError> {
    let mut payload = FormPayload::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        let value = Value::String(value.into_owned());
        match payload.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                payload.insert(key.into_owned(), value);
            }
        }
    }
    if payload.is_empty() {
        debug!("Urlencoded request body has no fields");
        return Err(FormError::InvalidInput);
    }
    Ok(payload)
}

/// Parse a raw request body into a non-empty JSON object
///
/// Empty bodies, invalid JSON, non-object JSON and `{}` all fail with
/// [`FormError::InvalidInput`].
pub fn parse_payload(body: &[u8]) -> Result<FormPayload, FormError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FormError::InvalidInput);
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Request body is not valid JSON");
        FormError::InvalidInput
    })?;
    match value {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(FormError::InvalidInput),
    }
}

/// Token carried in `field`, if it is a non-empty string
pub fn token_value<'a>(payload: &'a FormPayload, field: &str) -> Option<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Drop `field` from the payload, keeping every other field in its original order
pub fn strip_field(payload: FormPayload, field: &str) -> FormPayload {
    payload.into_iter().filter(|(k, _)| k != field).collect()
}

/// Values of the payload, in key order, as one spreadsheet row
pub fn build_row(payload: &FormPayload) -> Vec<Value> {
    payload.values().cloned().collect()
}
