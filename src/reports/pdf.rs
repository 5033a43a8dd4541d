// src/reports/pdf.rs

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::{error::AppError, reports::Report, utils::text::fold_turkish};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 14.0;
const LINE_HEIGHT: f32 = 6.0;
const BODY_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;

/// Rough Helvetica advance at 10pt, in millimetres.
const CHAR_WIDTH: f32 = 1.9;

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    tracing::error!("Failed to render PDF: {}", e);
    AppError::InternalServerError(e.to_string())
}

/// Top-down cursor over pages. Starts a fresh page when the next line
/// would cross the bottom margin.
struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl Writer {
    fn new(title: &str) -> Result<Self, AppError> {
        let (doc, page, layer) = PdfDocument::new(
            fold_turkish(title),
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            "Layer 1".to_string(),
        );
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN - 6.0,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    /// Returns true when a page break happened.
    fn ensure_room(&mut self, height: f32) -> bool {
        if self.y - height < MARGIN {
            self.new_page();
            return true;
        }
        false
    }

    fn text_at(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(fold_turkish(text), size, Mm(x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_room(LINE_HEIGHT);
        self.text_at(text, size, MARGIN, bold);
        self.y -= LINE_HEIGHT * (size / BODY_SIZE).max(1.0);
    }

    /// Writes a paragraph, wrapping words at the printable width.
    fn paragraph(&mut self, text: &str) {
        let max_chars = ((PAGE_WIDTH - 2.0 * MARGIN) / CHAR_WIDTH) as usize;
        for raw in text.lines() {
            let indent: String = raw.chars().take_while(|c| *c == ' ').collect();
            for wrapped in wrap(raw.trim_start(), max_chars.saturating_sub(indent.len()).max(10)) {
                self.line(&format!("{indent}{wrapped}"), BODY_SIZE, false);
            }
        }
        self.y -= LINE_HEIGHT / 2.0;
    }

    fn row(&mut self, cells: &[String], widths: &[f32], bold: bool) {
        let mut x = MARGIN;
        for (cell, width) in cells.iter().zip(widths) {
            let max_chars = ((width - 2.0) / CHAR_WIDTH).max(1.0) as usize;
            self.text_at(&clip(cell, max_chars), BODY_SIZE, x, bold);
            x += width;
        }
        self.y -= LINE_HEIGHT;
    }
}

/// Cuts a cell to its column, keeping the last character as a marker.
fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() { 0 } else { 1 } + word.chars().count();
        if !current.is_empty() && current.chars().count() + needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Renders a report to PDF bytes (A4, built-in Helvetica).
pub fn render(report: &Report) -> Result<Vec<u8>, AppError> {
    let mut w = Writer::new(&report.title)?;

    w.line(&report.title, TITLE_SIZE, true);
    for line in &report.subtitle {
        w.line(line, BODY_SIZE, false);
    }
    for (label, value) in &report.details {
        let text = if value.is_empty() {
            format!("{}: ______________________", label)
        } else {
            format!("{}: {}", label, value)
        };
        w.line(&text, BODY_SIZE, false);
    }
    w.y -= LINE_HEIGHT / 2.0;

    if let Some(table) = &report.table {
        let widths: Vec<f32> = table.columns.iter().map(|c| c.width).collect();
        let header: Vec<String> = table.columns.iter().map(|c| c.title.clone()).collect();

        w.ensure_room(LINE_HEIGHT * 2.0);
        w.row(&header, &widths, true);
        for row in &table.rows {
            if w.ensure_room(LINE_HEIGHT) {
                w.row(&header, &widths, true);
            }
            w.row(row, &widths, false);
        }
        w.y -= LINE_HEIGHT / 2.0;
    }

    for paragraph in &report.paragraphs {
        w.paragraph(paragraph);
    }

    tracing::debug!(title = %report.title, pages = w.pages, "Rendered PDF report");
    w.doc.save_to_bytes().map_err(pdf_error)
}
