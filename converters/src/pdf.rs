//! PDF text extraction.

use std::path::Path;

use crate::converter::Converter;
use crate::error::{ConversionError, Result};

/// Extracts the text layer of a PDF document.
///
/// Scanned PDFs without a text layer produce empty output; they are not run
/// through OCR.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfConverter;

impl Converter for PdfConverter {
    fn convert(&self, path: &Path) -> Result<String> {
        let text =
            pdf_extract::extract_text(path).map_err(|e| ConversionError::Pdf(e.to_string()))?;
        Ok(text)
    }
}
