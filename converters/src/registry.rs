//! Extension-keyed registry of converters.
//!
//! The `ConverterRegistry` maps a normalized extension (lowercase, with a
//! leading dot) to the converter that handles it. A missing entry is not an
//! error: callers treat it as an unsupported file type.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::converter::Converter;
use crate::ocr::{OcrConfig, OcrConverter};
use crate::office::{DocxConverter, PptxConverter};
use crate::pdf::PdfConverter;
use crate::spreadsheet::XlsxConverter;

/// Registry of converters by file extension.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    /// Converters by normalized extension.
    converters: HashMap<String, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in converters.
    pub fn standard(ocr: &OcrConfig) -> Self {
        let image: Arc<dyn Converter> = Arc::new(OcrConverter::new(ocr.clone()));

        let mut registry = Self::new();
        registry.register(".pdf", PdfConverter);
        registry.register(".docx", DocxConverter);
        registry.register(".pptx", PptxConverter);
        registry.register(".xlsx", XlsxConverter);
        for ext in [".png", ".jpg", ".jpeg"] {
            registry.register_shared(ext, image.clone());
        }
        registry
    }

    /// Register a converter for an extension, replacing any previous one.
    pub fn register(&mut self, extension: &str, converter: impl Converter + 'static) {
        self.register_shared(extension, Arc::new(converter));
    }

    /// Register an already shared converter for an extension.
    pub fn register_shared(&mut self, extension: &str, converter: Arc<dyn Converter>) {
        let key = normalize_extension(extension);
        debug!("Registered converter for {key}");
        self.converters.insert(key, converter);
    }

    /// Look up the converter for an extension.
    ///
    /// Matching is case-insensitive and exact; `"PDF"`, `".pdf"` and
    /// `".Pdf"` all resolve to the same entry.
    pub fn lookup(&self, extension: &str) -> Option<Arc<dyn Converter>> {
        self.converters.get(&normalize_extension(extension)).cloned()
    }

    /// Look up the converter for a path by its final extension.
    pub fn lookup_path(&self, path: &Path) -> Option<Arc<dyn Converter>> {
        let ext = path.extension()?.to_str()?;
        self.lookup(ext)
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Check if no converter is registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// Normalize an extension to lowercase with a single leading dot.
pub fn normalize_extension(extension: &str) -> String {
    let lower = extension.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}
