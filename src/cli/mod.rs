//! # CLI Module
//!
//! Command-line interface of the `formsheet` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the standalone HTTP server:
//!
//! ```bash
//! formsheet serve --config formsheet.yaml --addr 127.0.0.1:3000
//! ```
//!
//! Runs until SIGINT or SIGTERM.
//!
//! ### `check-config`
//!
//! Load and validate configuration, then print a summary with secrets hidden:
//!
//! ```bash
//! formsheet check-config --config formsheet.yaml
//! ```
//!
//! ### `submit`
//!
//! Push one submission through the real pipeline without starting a server:
//!
//! ```bash
//! formsheet submit --json '{"name":"Ada","email":"a@x.com","recaptchaToken":"..."}'
//! ```
//!
//! Every command reads the same environment variables as the server
//! (`GOOGLE_SPREADSHEET_ID`, `RECAPTCHA_SECRET_KEY`, ...); `--config` adds a file
//! underneath them.

mod commands;


pub use commands::{run_cli, Cli, Commands};
