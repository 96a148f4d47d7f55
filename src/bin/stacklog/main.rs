// stacklog - send log events through the channels of a router config

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use commands::execute;
use stacklog::log::{LogRouter, RouterConfig};

/// Get default config path (~/.stacklog/config.yaml)
fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".stacklog").join("config.yaml"))
}

fn load_config(path: &PathBuf) -> Result<RouterConfig> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Config file not found: {}. Please create it first.",
            path.display()
        ));
    }

    RouterConfig::from_file(path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(ref path) => PathBuf::from(shellexpand::tilde(path).to_string()),
        None => default_config_path()?,
    };

    let config = load_config(&config_path)?;
    let router = LogRouter::new(config)?;

    execute(&cli.command, &router).await?;
    Ok(())
}
