use anyhow::Result;
use clap::Parser;
use prospect_common::observability::{init_logging, LogConfig};

use cli::Cli;

mod cli;
mod commands;
mod render;
mod wiring;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = wiring::load_config(cli.config.as_deref())?;

    init_logging(LogConfig {
        app_name: "prospect",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr || cli.verbose,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;

    commands::run(cli.command, cfg).await
}
