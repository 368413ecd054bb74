use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::AppConfig;
use crate::logging::LogConfig;
use crate::routes::{FormApp, IncomingRequest, SUBMIT_PATH};
use crate::runtime_config::RuntimeConfig;
use crate::server::{wait_for_shutdown_signal, FormService, HttpServer};

/// Command-line interface for formsheet
#[derive(Parser)]
#[command(name = "formsheet")]
#[command(about = "Bot-checked form submissions appended to Google Sheets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the standalone HTTP server
    Serve {
        /// Optional config file (YAML, TOML or JSON); environment variables override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address, overriding HOST and PORT (e.g. 127.0.0.1:3000)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Validate configuration and print a summary with secrets hidden
    CheckConfig {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run one submission through the pipeline and print the JSON response
    Submit {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Form payload as a JSON object
        #[arg(long)]
        json: String,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    AppConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load configuration from environment".to_string(),
    })
}

/// Execute a parsed command line
pub fn run_cli(cli: Cli, logging: &LogConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { config, addr } => {
            let cfg = load_config(config.as_deref())?;
            let runtime = RuntimeConfig::from_env();
            runtime.apply();
            info!(stack_size = runtime.stack_size, "Coroutine runtime configured");

            let app = FormApp::from_config(&cfg, logging.redact_level)?;
            let addr = match addr {
                Some(a) => a,
                None => cfg.bind_addr()?.to_string(),
            };

            let handle = HttpServer(FormService::new(app))
                .start(addr.as_str())
                .with_context(|| format!("Failed to bind {addr}"))?;
            handle.wait_ready().context("Server did not become ready")?;
            info!(addr = %handle.addr(), "Form submission service started");

            wait_for_shutdown_signal().context("Failed to install signal handlers")?;
            info!("Shutting down");
            handle.stop();
            Ok(())
        }
        Commands::CheckConfig { config } => {
            let cfg = load_config(config.as_deref())?;
            println!("{}", cfg.summary());
            let warnings = cfg.warnings();
            if warnings.is_empty() {
                println!("\nConfiguration OK");
            } else {
                println!();
                for w in warnings {
                    println!("warning: {w}");
                }
            }
            Ok(())
        }
        Commands::Submit { config, json } => {
            let cfg = load_config(config.as_deref())?;
            let app = FormApp::from_config(&cfg, logging.redact_level)?;
            let response = app.handle(&IncomingRequest {
                method: "POST".to_string(),
                path: SUBMIT_PATH.to_string(),
                origin: None,
                content_type: Some("application/json".to_string()),
                body: json.into_bytes(),
            });
            let body = response
                .body
                .as_ref()
                .map(serde_json::to_string_pretty)
                .transpose()?
                .unwrap_or_default();
            println!("{body}");
            if response.status != 200 {
                bail!("Submission failed with HTTP {}", response.status);
            }
            Ok(())
        }
    }
}
