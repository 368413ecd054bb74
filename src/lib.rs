//! # formsheet
//!
//! **formsheet** accepts HTTP form submissions, checks them with reCAPTCHA, and
//! appends each accepted submission as one row of a Google Sheets spreadsheet. It
//! runs as a standalone `may_minihttp` server or behind a serverless HTTP trigger.
//!
//! ## Architecture
//!
//! - **[`pipeline`]** - The submission pipeline: parse, verify, filter, append
//! - **[`verify`]** - Bot-verification seam and the reCAPTCHA `siteverify` client
//! - **[`sheets`]** - Spreadsheet-append seam, the Sheets v4 client and service-account auth
//! - **[`routes`]** - Transport-neutral routing shared by both hosts
//! - **[`server`]** - Standalone HTTP server on `may` coroutines
//! - **[`function`]** - Serverless adapter over `http::Request`/`http::Response`
//! - **[`cors`]** - Cross-origin policy and preflight handling
//! - **[`config`]** - Startup configuration from file and environment
//! - **[`logging`]** - Structured logging and payload redaction
//! - **[`cli`]** - The `formsheet` command line
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Host as HttpServer / function
//!     participant App as FormApp
//!     participant Pipeline as FormSubmissionPipeline
//!     participant Verify as reCAPTCHA
//!     participant Sheets as Sheets API
//!
//!     Client->>Host: POST /api/submit-form
//!     Host->>App: IncomingRequest
//!     App->>Pipeline: submit(body)
//!     Pipeline->>Pipeline: Parse JSON object
//!     alt Empty or invalid
//!         Pipeline-->>Client: 400 No form data provided
//!     end
//!     Pipeline->>Verify: siteverify(secret, token)
//!     alt Rejected or score below threshold
//!         Pipeline-->>Client: 400 Verification failed
//!     end
//!     Pipeline->>Sheets: values.append(row, USER_ENTERED)
//!     alt Upstream error
//!         Pipeline-->>Client: 500 Failed to submit form data
//!     end
//!     Sheets-->>Pipeline: updates.updatedRows
//!     Pipeline-->>App: SubmissionOutcome
//!     App-->>Client: 200 {success, message, updatedRows}
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use formsheet::config::AppConfig;
//! use formsheet::logging::RedactionLevel;
//! use formsheet::routes::FormApp;
//! use formsheet::server::{FormService, HttpServer};
//!
//! let config = AppConfig::load(None).expect("configuration");
//! let app = FormApp::from_config(&config, RedactionLevel::Credentials).expect("clients");
//! let handle = HttpServer(FormService::new(app))
//!     .start("127.0.0.1:3000")
//!     .expect("bind");
//! handle.join().ok();
//! ```
//!
//! ## Runtime Considerations
//!
//! formsheet uses the `may` coroutine runtime, not tokio. External calls use the
//! blocking `reqwest` client, each bounded by `HTTP_TIMEOUT_MS`. Coroutine stack size
//! is configurable via `FORMSHEET_STACK_SIZE`.

pub mod cli;
pub mod config;
pub mod cors;
pub mod error;
pub mod function;
pub mod logging;
pub mod pipeline;
pub mod routes;
pub mod runtime_config;
pub mod server;
pub mod sheets;
pub mod verify;

pub use error::FormError;
pub use function::handle_function_request;
pub use pipeline::{FormSubmissionPipeline, PipelineConfig, SubmissionOutcome};
pub use routes::{ApiResponse, FormApp, IncomingRequest};
