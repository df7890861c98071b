//! Configuration for a sync session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use texbinet_converters::OcrConfig;

use crate::error::{Result, SyncError};

/// Configuration for one watched root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Path to the watched directory.
    pub target: PathBuf,

    /// Whether to sync pre-existing files at startup.
    pub initial_scan: bool,

    /// How long an unpaired rename source waits for its destination before
    /// it is treated as deleted, in milliseconds.
    pub rename_grace_ms: u64,

    /// Queue depth at which (and at every multiple of which) a backlog
    /// warning is logged. Zero disables the warning.
    pub queue_warn_depth: usize,

    /// OCR settings for image converters.
    pub ocr: OcrConfig,
}

impl SyncConfig {
    /// Create a new config for the given directory.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            initial_scan: true,
            rename_grace_ms: 250,
            queue_warn_depth: 1000,
            ocr: OcrConfig::default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Parse a config from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the watched directory.
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = target.into();
        self
    }

    /// Skip the startup scan.
    pub fn without_initial_scan(mut self) -> Self {
        self.initial_scan = false;
        self
    }

    /// Set the rename pairing window.
    pub fn with_rename_grace(mut self, grace: Duration) -> Self {
        self.rename_grace_ms = grace.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Set the backlog warning depth.
    pub fn with_queue_warn_depth(mut self, depth: usize) -> Self {
        self.queue_warn_depth = depth;
        self
    }

    /// Set the OCR settings.
    pub fn with_ocr(mut self, ocr: OcrConfig) -> Self {
        self.ocr = ocr;
        self
    }

    /// The rename pairing window as a duration.
    pub fn rename_grace(&self) -> Duration {
        Duration::from_millis(self.rename_grace_ms)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.ocr.command.trim().is_empty() {
            return Err(SyncError::Config("ocr.command must not be empty".to_string()));
        }
        // The monitor waits on this interval while idle.
        if self.rename_grace_ms == 0 {
            return Err(SyncError::Config(
                "rename_grace_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
