use clap::Parser;
use formsheet::cli::{run_cli, Cli};
use formsheet::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env();
    // Held until exit so buffered async log lines are flushed
    let _log_guard = init_logging(&log_config)?;

    run_cli(cli, &log_config)
}
