//! Error types for text conversion.

use thiserror::Error;

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Errors a converter can report for a single file.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The source could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF text extraction failed.
    #[error("pdf extraction failed: {0}")]
    Pdf(String),

    /// The Office document is not a readable ZIP archive.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An XML part inside the document is malformed.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A required part is missing from the document package.
    #[error("missing document part: {0}")]
    MissingPart(String),

    /// Spreadsheet parsing failed.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// The OCR command failed or could not be started.
    #[error("ocr failed: {0}")]
    Ocr(String),
}
