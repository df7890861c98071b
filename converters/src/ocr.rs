//! Image text recognition through an external OCR command.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::converter::Converter;
use crate::error::{ConversionError, Result};

/// Settings for the OCR command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Executable to run. It is invoked as `<command> <image> stdout -l <languages>`.
    pub command: String,

    /// Recognition languages, joined with `+`.
    pub languages: Vec<String>,
}

impl OcrConfig {
    /// Set the OCR executable.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the recognition languages.
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
            languages: vec!["eng".to_string(), "jpn".to_string()],
        }
    }
}

/// Runs OCR over raster images.
#[derive(Debug, Clone)]
pub struct OcrConverter {
    config: OcrConfig,
}

impl OcrConverter {
    /// Create a converter using the given OCR settings.
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.arg(path).arg("stdout");
        if !self.config.languages.is_empty() {
            cmd.arg("-l").arg(self.config.languages.join("+"));
        }
        cmd
    }
}

impl Converter for OcrConverter {
    fn convert(&self, path: &Path) -> Result<String> {
        debug!("Running {} on {}", self.config.command, path.display());

        let output = self.command(path).output().map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                ConversionError::Ocr(format!("command not found: {}", self.config.command))
            }
            _ => ConversionError::Io(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConversionError::Ocr(format!(
                "{} exited with {}: {}",
                self.config.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(recognized_lines(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Drop blank lines and surrounding whitespace from OCR output.
fn recognized_lines(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
