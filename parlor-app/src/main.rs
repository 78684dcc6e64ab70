use anyhow::Result;
use clap::Parser;
use parlor_common::observability::{LogConfig, init_logging};
use parlor_config::{ParlorConfig, ParlorConfigLoader};
use std::path::PathBuf;
use tether::{Tether, build_from_config};
mod tether;

/// Terminal chat client.
#[derive(Debug, Parser)]
#[command(name = "parlor", version, about)]
struct Cli {
    /// YAML configuration file; missing is fine.
    #[arg(long, short, default_value = "parlor.yaml", env = "PARLOR_CONFIG")]
    config: PathBuf,

    /// Chat endpoint URL, overriding the configuration.
    #[arg(long)]
    endpoint: Option<String>,

    /// Go straight to the chat screen.
    #[arg(long)]
    no_intro: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // env wins over file, flags win over both
    let mut cfg: ParlorConfig = ParlorConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()?;
    if let Some(endpoint) = cli.endpoint {
        cfg.endpoint.url = endpoint;
    }
    if cli.no_intro {
        cfg.intro.enabled = false;
    }

    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: false,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;
    tracing::info!(
        config = %cli.config.display(),
        endpoint = %cfg.endpoint.url,
        logs = %log_path.display(),
        "parlor starting"
    );

    let mut tether = Tether::new();
    build_from_config(&mut tether, cfg).await?;

    tether.run().await
}
