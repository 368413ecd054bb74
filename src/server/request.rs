use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, warn};

use crate::routes::IncomingRequest;

/// Request data extracted from a `may_minihttp::Request`
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request target including query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Raw body bytes; JSON parsing is the pipeline's job
    pub body: Vec<u8>,
}

impl ParsedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn into_incoming(self) -> IncomingRequest {
        let origin = self.headers.get("origin").cloned();
        let content_type = self.headers.get("content-type").cloned();
        IncomingRequest {
            method: self.method,
            path: self.path,
            origin,
            content_type,
            body: self.body,
        }
    }
}

/// Parse an incoming HTTP request into a [`ParsedRequest`]
///
/// Headers are read before the body since reading the body consumes the request.
/// A body that fails mid-read is treated as empty, which the pipeline rejects as
/// missing form data.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let path = req.path().to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    debug!(
        header_count = headers.len(),
        header_names = ?headers.keys().take(20).collect::<Vec<_>>(),
        "Headers extracted"
    );

    let mut body = Vec::new();
    if let Err(e) = req.body().read_to_end(&mut body) {
        warn!(error = %e, "Failed to read request body");
        body.clear();
    }

    debug!(
        body_size_bytes = body.len(),
        content_type = ?headers.get("content-type"),
        "Request body read"
    );

    ParsedRequest {
        method,
        path,
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_incoming_carries_origin() {
        let mut headers = HashMap::new();
        headers.insert("origin".to_string(), "https://a.example".to_string());
        headers.insert("content-type".to_string(), "application/json".to_string());
        let parsed = ParsedRequest {
            method: "POST".into(),
            path: "/api/submit-form".into(),
            headers,
            body: b"{}".to_vec(),
        };
        assert_eq!(parsed.header("content-type"), Some("application/json"));

        let incoming = parsed.into_incoming();
        assert_eq!(incoming.origin.as_deref(), Some("https://a.example"));
        assert_eq!(incoming.content_type.as_deref(), Some("application/json"));
        assert_eq!(incoming.body, b"{}".to_vec());
    }
}
