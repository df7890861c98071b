//! # Converters
//!
//! Text extraction capabilities keyed by file extension.
//!
//! The sync engine only knows the [`Converter`] trait and asks the
//! [`ConverterRegistry`] for the converter matching a source file's
//! extension. This crate also ships the built-in converters:
//!
//! | extension | converter |
//! |---|---|
//! | `.pdf` | [`PdfConverter`] |
//! | `.docx` | [`DocxConverter`] |
//! | `.pptx` | [`PptxConverter`] |
//! | `.xlsx` | [`XlsxConverter`] |
//! | `.png`, `.jpg`, `.jpeg` | [`OcrConverter`] |

pub mod converter;
pub mod error;
pub mod ocr;
pub mod office;
pub mod pdf;
pub mod registry;
pub mod spreadsheet;

pub use converter::Converter;
pub use error::{ConversionError, Result};
pub use ocr::{OcrConfig, OcrConverter};
pub use office::{DocxConverter, PptxConverter};
pub use pdf::PdfConverter;
pub use registry::{ConverterRegistry, normalize_extension};
pub use spreadsheet::XlsxConverter;
