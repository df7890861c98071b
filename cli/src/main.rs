//! texbinet - keep `.cabi.txt` text sidecars next to your documents.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use texbinet_converters::ConverterRegistry;
use texbinet_sidecar_sync::{SidecarSync, SyncConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Watch a directory and keep a plain-text sidecar next to every document.
#[derive(Debug, Parser)]
#[command(name = "texbinet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to watch (overrides `target` from the config file)
    target: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Don't sync files that already exist at startup
    #[arg(long)]
    no_initial_scan: bool,

    /// OCR executable for image files
    #[arg(long)]
    ocr_command: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => match &self.target {
                Some(target) => SyncConfig::new(target),
                None => bail!("no directory given; pass TARGET or --config"),
            },
        };

        if let Some(target) = self.target {
            config = config.with_target(target);
        }
        if self.no_initial_scan {
            config = config.without_initial_scan();
        }
        if let Some(command) = self.ocr_command {
            let ocr = config.ocr.clone().with_command(command);
            config = config.with_ocr(ocr);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    let registry = ConverterRegistry::standard(&config.ocr);
    let engine = SidecarSync::start(config, registry)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Shutting down, finishing queued work");

    engine.stop();
    tokio::task::spawn_blocking(move || engine.join()).await??;
    Ok(())
}
