//! # Serverless Adapter
//!
//! Entry point for serverless HTTP triggers (custom-handler style hosts that forward
//! each invocation as a plain HTTP request). Converts `http` types to and from the
//! transport-neutral [`crate::routes`] types; no behavior of its own.

use http::header::{CONTENT_TYPE, ORIGIN};
use http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use tracing::{error, info};

use crate::routes::{FormApp, IncomingRequest};

/// Handle one serverless invocation
pub fn handle_function_request(app: &FormApp, req: Request<Vec<u8>>) -> Response<Vec<u8>> {
    info!(url = %req.uri(), "Http function processed request");

    let (parts, body) = req.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let origin = header(ORIGIN);
    let content_type = header(CONTENT_TYPE);

    let incoming = IncomingRequest {
        method: parts.method.as_str().to_string(),
        path,
        origin,
        content_type,
        body,
    };
    let api = app.handle(&incoming);

    let status = StatusCode::from_u16(api.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(api.body_bytes());
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for header in &api.headers {
        match (
            HeaderName::from_bytes(header.name.as_bytes()),
            HeaderValue::from_str(header.value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => error!(header = header.name, "Dropping unrepresentable response header"),
        }
    }
    response
}
