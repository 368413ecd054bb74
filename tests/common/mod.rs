#![allow(dead_code)]

/// Counting fakes for the two external collaborators
pub mod fakes {
    use formsheet::sheets::{AppendOutcome, SheetAppender, SheetsError};
    use formsheet::verify::{BotVerifier, SiteVerifyResponse, VerifyError};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct FakeVerifier {
        result: Result<SiteVerifyResponse, VerifyError>,
        calls: AtomicUsize,
        tokens: Mutex<Vec<String>>,
    }

    impl FakeVerifier {
        pub fn returning(result: Result<SiteVerifyResponse, VerifyError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
                tokens: Mutex::new(Vec::new()),
            }
        }

        pub fn score(score: f64) -> Self {
            Self::returning(Ok(SiteVerifyResponse {
                success: true,
                score: Some(score),
                action: Some("submit".into()),
                ..Default::default()
            }))
        }

        pub fn unsuccessful(codes: &[&str]) -> Self {
            Self::returning(Ok(SiteVerifyResponse {
                success: false,
                error_codes: codes.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            }))
        }

        pub fn failing(err: VerifyError) -> Self {
            Self::returning(Err(err))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn tokens(&self) -> Vec<String> {
            self.tokens.lock().unwrap().clone()
        }
    }

    impl BotVerifier for FakeVerifier {
        fn verify(&self, token: &str) -> Result<SiteVerifyResponse, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens.lock().unwrap().push(token.to_string());
            self.result.clone()
        }
    }

    pub struct FakeSheets {
        result: Result<AppendOutcome, SheetsError>,
        calls: AtomicUsize,
        rows: Mutex<Vec<Vec<Value>>>,
    }

    impl FakeSheets {
        pub fn returning(result: Result<AppendOutcome, SheetsError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
                rows: Mutex::new(Vec::new()),
            }
        }

        pub fn updated(rows: u64) -> Self {
            Self::returning(Ok(AppendOutcome {
                updated_rows: rows,
                updated_range: Some("Sheet1!A2:C2".into()),
            }))
        }

        pub fn failing(err: SheetsError) -> Self {
            Self::returning(Err(err))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn rows(&self) -> Vec<Vec<Value>> {
            self.rows.lock().unwrap().clone()
        }
    }

    impl SheetAppender for FakeSheets {
        fn append_row(&self, row: &[Value]) -> Result<AppendOutcome, SheetsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rows.lock().unwrap().push(row.to_vec());
            self.result.clone()
        }
    }
}

/// Builders wiring fakes into a pipeline or app
pub mod app {
    use super::fakes::{FakeSheets, FakeVerifier};
    use formsheet::cors::CorsPolicy;
    use formsheet::pipeline::{FormSubmissionPipeline, PipelineConfig};
    use formsheet::routes::FormApp;
    use std::sync::Arc;

    pub fn pipeline(
        config: PipelineConfig,
        verifier: &Arc<FakeVerifier>,
        sheets: &Arc<FakeSheets>,
    ) -> FormSubmissionPipeline {
        FormSubmissionPipeline::new(config, verifier.clone(), sheets.clone())
    }

    pub fn form_app(
        config: PipelineConfig,
        cors: CorsPolicy,
        verifier: &Arc<FakeVerifier>,
        sheets: &Arc<FakeSheets>,
    ) -> FormApp {
        FormApp::new(pipeline(config, verifier, sheets), cors)
    }

    /// App with verification on, default threshold, wildcard CORS
    pub fn default_app(verifier: &Arc<FakeVerifier>, sheets: &Arc<FakeSheets>) -> FormApp {
        form_app(PipelineConfig::default(), CorsPolicy::wildcard(), verifier, sheets)
    }
}

pub mod test_server {
    use formsheet::routes::FormApp;
    use formsheet::server::{FormService, HttpServer, ServerHandle};
    use std::net::{SocketAddr, TcpListener};
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Running server on a random port, stopped on drop
    pub struct TestServer {
        handle: Option<ServerHandle>,
        addr: SocketAddr,
    }

    impl TestServer {
        pub fn start(app: FormApp) -> Self {
            setup_may_runtime();
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let handle = HttpServer(FormService::new(app)).start(addr).unwrap();
            handle.wait_ready().unwrap();
            Self {
                handle: Some(handle),
                addr,
            }
        }

        pub fn addr(&self) -> SocketAddr {
            self.addr
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }
}

/// Raw HTTP/1.1 over TcpStream
pub mod http {
    use serde_json::Value;
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    pub struct RawResponse {
        pub status: u16,
        /// Lowercased header names
        pub headers: HashMap<String, String>,
        pub body: String,
    }

    impl RawResponse {
        pub fn json(&self) -> Value {
            serde_json::from_str(&self.body).unwrap_or_default()
        }

        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).map(String::as_str)
        }
    }

    fn content_length(head: &str) -> usize {
        head.lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Send a raw request and read exactly one response
    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 4096];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                if buf.len() >= end + 4 + content_length(&text[..end]) {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn parse_response(resp: &str) -> RawResponse {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        RawResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }

    pub fn request(addr: &SocketAddr, req: &str) -> RawResponse {
        parse_response(&send_request(addr, req))
    }

    /// POST a JSON body to `path`, optionally with an Origin header
    pub fn post_json(addr: &SocketAddr, path: &str, body: &str, origin: Option<&str>) -> RawResponse {
        let origin_line = origin
            .map(|o| format!("Origin: {o}\r\n"))
            .unwrap_or_default();
        let req = format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\n{origin_line}Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        request(addr, &req)
    }

    /// POST an urlencoded HTML form body to `path`
    pub fn post_form(addr: &SocketAddr, path: &str, body: &str) -> RawResponse {
        let req = format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        request(addr, &req)
    }
}

/// One-shot HTTP mocks for the verification, token and sheets endpoints
pub mod mock {
    use std::sync::{Arc, Mutex};
    use std::thread::JoinHandle;

    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub method: String,
        pub url: String,
        /// Lowercased header names
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl Recorded {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        pub fn form(&self) -> Vec<(String, String)> {
            url::form_urlencoded::parse(self.body.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        }
    }

    /// Serves the given `(status, json body)` responses in order, then stops
    pub struct MockServer {
        pub url: String,
        received: Arc<Mutex<Vec<Recorded>>>,
        handle: Option<JoinHandle<()>>,
    }

    impl MockServer {
        pub fn start(responses: Vec<(u16, String)>) -> Self {
            let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
            let addr = server.server_addr().to_ip().unwrap();
            let received = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&received);
            let handle = std::thread::spawn(move || {
                for (status, body) in responses {
                    let Ok(mut req) = server.recv() else { return };
                    let mut req_body = String::new();
                    req.as_reader().read_to_string(&mut req_body).unwrap();
                    sink.lock().unwrap().push(Recorded {
                        method: req.method().as_str().to_string(),
                        url: req.url().to_string(),
                        headers: req
                            .headers()
                            .iter()
                            .map(|h| {
                                (
                                    h.field.as_str().as_str().to_ascii_lowercase(),
                                    h.value.as_str().to_string(),
                                )
                            })
                            .collect(),
                        body: req_body,
                    });
                    let content_type = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"application/json"[..],
                    )
                    .unwrap();
                    let response = tiny_http::Response::from_string(body)
                        .with_status_code(status)
                        .with_header(content_type);
                    let _ = req.respond(response);
                }
            });
            Self {
                url: format!("http://{addr}"),
                received,
                handle: Some(handle),
            }
        }

        /// Wait until every queued response was served, then return what arrived
        pub fn finish(mut self) -> Vec<Recorded> {
            if let Some(h) = self.handle.take() {
                h.join().unwrap();
            }
            self.received.lock().unwrap().clone()
        }

        pub fn received(&self) -> Vec<Recorded> {
            self.received.lock().unwrap().clone()
        }
    }

    /// Base URL of an endpoint that accepts connections and never answers
    pub fn silent_endpoint() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });
        format!("http://{addr}")
    }
}

pub mod fixtures {
    pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_service_account_key.pem");
    pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_service_account_pub.pem");
    pub const TEST_CLIENT_EMAIL: &str = "forms@test-project.iam.gserviceaccount.com";
}
