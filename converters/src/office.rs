//! Office Open XML documents (DOCX, PPTX).
//!
//! Both formats are ZIP packages of XML parts. Only the text-bearing parts
//! are read: `word/document.xml` for DOCX and `ppt/slides/slideN.xml` for
//! PPTX. Table rows are flattened to their cells' text joined with `", "`.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::converter::Converter;
use crate::error::{ConversionError, Result};

const DOCX_BODY: &str = "word/document.xml";
const PPTX_SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Extracts body paragraphs and tables from a Word document.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxConverter;

impl Converter for DocxConverter {
    fn convert(&self, path: &Path) -> Result<String> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let xml = read_part(&mut archive, DOCX_BODY)?;
        Ok(docx_text(&xml)?.join("\n"))
    }
}

/// Extracts shape text and tables from a PowerPoint presentation, slide by
/// slide.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxConverter;

impl Converter for PptxConverter {
    fn convert(&self, path: &Path) -> Result<String> {
        let mut archive = ZipArchive::new(File::open(path)?)?;

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort_unstable();

        let mut lines = Vec::new();
        for (page, (_, name)) in slides.iter().enumerate() {
            lines.push(format!("--- Page {} ---", page + 1));
            let xml = read_part(&mut archive, name)?;
            lines.extend(slide_text(&xml)?);
        }

        Ok(lines.join("\n"))
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ConversionError::MissingPart(name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

/// `ppt/slides/slide12.xml` -> `12`.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(PPTX_SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collects cell text of the table currently being read.
#[derive(Debug, Default)]
struct TableRows {
    depth: usize,
    row: Vec<String>,
    cell: String,
}

impl TableRows {
    fn active(&self) -> bool {
        self.depth > 0
    }

    fn start(&mut self, name: &[u8]) {
        match name {
            b"tbl" => self.depth += 1,
            b"tr" if self.depth == 1 => self.row.clear(),
            b"tc" if self.depth == 1 => self.cell.clear(),
            _ => {}
        }
    }

    /// Returns a finished row when a top-level `tr` closes.
    fn end(&mut self, name: &[u8]) -> Option<String> {
        match name {
            b"tbl" => {
                self.depth = self.depth.saturating_sub(1);
                None
            }
            b"tc" if self.depth == 1 => {
                self.row.push(self.cell.replace('\n', ""));
                None
            }
            b"tr" if self.depth == 1 => Some(self.row.join(", ")),
            _ => None,
        }
    }
}

/// Lines of a DOCX `document.xml`: one per body paragraph, one per table row.
fn docx_text(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut table = TableRows::default();
    let mut paragraph: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"t" => in_text = true,
                    b"p" if !table.active() => paragraph = Some(String::new()),
                    other => table.start(other),
                }
            }
            Event::Empty(e) => {
                let name = e.local_name();
                let ch = match name.as_ref() {
                    b"p" if !table.active() => {
                        lines.push(String::new());
                        None
                    }
                    b"tab" => Some('\t'),
                    b"br" | b"cr" => Some('\n'),
                    _ => None,
                };
                if let Some(ch) = ch {
                    if table.active() {
                        table.cell.push(ch);
                    } else if let Some(p) = paragraph.as_mut() {
                        p.push(ch);
                    }
                }
            }
            Event::Text(t) if in_text => {
                let text = t.unescape()?;
                if table.active() {
                    table.cell.push_str(&text);
                } else if let Some(p) = paragraph.as_mut() {
                    p.push_str(&text);
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"t" => in_text = false,
                    b"p" if !table.active() => {
                        if let Some(p) = paragraph.take() {
                            lines.push(p);
                        }
                    }
                    other => {
                        if let Some(row) = table.end(other) {
                            lines.push(row);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines)
}

/// Lines of one PPTX slide: one per text shape, one per table row.
fn slide_text(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut table = TableRows::default();
    // Text of the enclosing `sp`, present once it has a text body.
    let mut shape: Option<String> = None;
    let mut in_shape = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"sp" => {
                        in_shape = true;
                        shape = None;
                    }
                    b"txBody" if in_shape => shape = Some(String::new()),
                    b"t" => in_text = true,
                    other => table.start(other),
                }
            }
            Event::Text(t) if in_text => {
                let text = t.unescape()?;
                if table.active() {
                    table.cell.push_str(&text);
                } else if let Some(s) = shape.as_mut() {
                    s.push_str(&text);
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"sp" => {
                        in_shape = false;
                        if let Some(s) = shape.take() {
                            lines.push(s.replace('\n', ""));
                        }
                    }
                    b"t" => in_text = false,
                    other => {
                        if let Some(row) = table.end(other) {
                            lines.push(row);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines)
}
