//! # Standalone Server
//!
//! The `may_minihttp` front end. [`FormService`] adapts raw HTTP requests into
//! [`crate::routes::IncomingRequest`]s; [`HttpServer`] and [`ServerHandle`] manage the
//! listening coroutine.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{wait_for_shutdown_signal, HttpServer, ServerHandle};
pub use request::{parse_request, ParsedRequest};
pub use response::write_api_response;
pub use service::FormService;
