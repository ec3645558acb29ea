//! PDF rendering of report documents.
//!
//! Pages are A4 portrait, laid out top to bottom with the built-in Helvetica
//! fonts, so no font files are needed. Built-in fonts only cover a single-byte
//! encoding; text is folded to ASCII first. Figures are listed by caption and
//! path rather than embedded.

use crate::document::{Block, ReportDocument, Span, parse_inline};
use crate::error::Result;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use std::path::Path;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.0;
const MIN_TABLE_SIZE: f32 = 5.5;
const MAX_CELL_CHARS: usize = 40;
const PT_TO_MM: f32 = 0.3528;

/// Replace characters outside ASCII with close ASCII equivalents.
pub fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            c if c.is_ascii() => out.push(c),
            '\u{2014}' | '\u{2013}' | '\u{2212}' | '\u{2010}' => out.push('-'),
            '\u{2018}' | '\u{2019}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2265}' => out.push_str(">="),
            '\u{2264}' => out.push_str("<="),
            '\u{2248}' => out.push('~'),
            '\u{00D7}' => out.push('x'),
            '\u{00B1}' => out.push_str("+/-"),
            '\u{00B2}' => out.push_str("^2"),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' | '\u{00B7}' => out.push('-'),
            '\u{2192}' => out.push_str("->"),
            '\u{03B1}' => out.push_str("alpha"),
            '\u{03B2}' => out.push_str("beta"),
            '\u{03B5}' => out.push_str("eps"),
            '\u{03C3}' => out.push_str("sigma"),
            '\u{00A0}' | '\u{2009}' | '\u{202F}' => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

/// Approximate rendered width in millimetres of Helvetica text.
fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let em = if bold { 0.56 } else { 0.52 };
    text.chars().count() as f32 * size * PT_TO_MM * em
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.4
}

/// A word positioned on a wrapped line.
#[derive(Debug, Clone, PartialEq)]
struct Word {
    text: String,
    bold: bool,
}

/// Greedy word wrap of inline spans into lines no wider than `width` mm.
fn wrap_spans(spans: &[Span], size: f32, width: f32) -> Vec<Vec<Word>> {
    let space = text_width(" ", size, false);
    let mut lines = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut used = 0.0_f32;
    for span in spans {
        for raw in fold_to_ascii(&span.text).split_whitespace() {
            let w = text_width(raw, size, span.bold);
            let needed = if current.is_empty() { w } else { used + space + w };
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                used = w;
            } else {
                used = needed;
            }
            current.push(Word {
                text: raw.to_string(),
                bold: span.bold,
            });
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut s: String = text.chars().take(max.saturating_sub(2)).collect();
        s.push_str("..");
        s
    }
}

struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(fold_to_ascii(title), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    const fn content_width() -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn text_at(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn spans(&mut self, spans: &[Span], size: f32, indent: f32) {
        let width = Self::content_width() - indent;
        let space = text_width(" ", size, false);
        for line in wrap_spans(spans, size, width) {
            let h = line_height(size);
            self.ensure_space(h);
            self.y -= h;
            let mut x = MARGIN + indent;
            for word in &line {
                self.text_at(&word.text, size, x, word.bold);
                x += text_width(&word.text, size, word.bold) + space;
            }
        }
    }

    fn rule(&mut self) {
        self.ensure_space(4.0);
        self.y -= 2.0;
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(self.y)), false),
            ],
            is_closed: false,
        });
        self.y -= 2.0;
    }

    fn table(&mut self, headers: &[String], rows: &[Vec<String>]) {
        let headers: Vec<String> = headers
            .iter()
            .map(|h| truncate(&fold_to_ascii(h), MAX_CELL_CHARS))
            .collect();
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(|c| truncate(&fold_to_ascii(c), MAX_CELL_CHARS)).collect())
            .collect();
        let chars: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                rows.iter()
                    .map(|r| r.get(i).map_or(0, |c| c.chars().count()))
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .max(1)
            })
            .collect();
        let total_chars = chars.iter().sum::<usize>() + 2 * chars.len();
        let natural = text_width(&"x".repeat(total_chars), TABLE_SIZE, true);
        let size = if natural > Self::content_width() {
            (TABLE_SIZE * Self::content_width() / natural).max(MIN_TABLE_SIZE)
        } else {
            TABLE_SIZE
        };
        let col_width: Vec<f32> = chars
            .iter()
            .map(|&n| text_width(&"x".repeat(n + 2), size, true))
            .collect();

        let h = line_height(size);
        let draw_row = |writer: &mut Self, cells: &[String], bold: bool| {
            writer.ensure_space(h);
            writer.y -= h;
            let mut x = MARGIN;
            for (cell, w) in cells.iter().zip(&col_width) {
                writer.text_at(cell, size, x, bold);
                x += w;
            }
        };
        draw_row(self, &headers, true);
        self.rule();
        for row in &rows {
            draw_row(self, row, false);
        }
    }

    fn finish(self) -> Result<Vec<u8>> {
        Ok(self.doc.save_to_bytes()?)
    }
}

impl ReportDocument {
    /// Render as PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the PDF backend fails.
    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>> {
        let mut w = PdfWriter::new(self.title_text().unwrap_or("Report"))?;
        for block in self.blocks() {
            match block {
                Block::Title(t) => {
                    w.spans(&[Span::bold(t.as_str())], 18.0, 0.0);
                    w.gap(4.0);
                }
                Block::Heading { level, text } => {
                    let size = match level {
                        1 => 14.0,
                        2 => 12.0,
                        _ => 11.0,
                    };
                    w.ensure_space(line_height(size) * 3.0);
                    w.gap(2.0);
                    w.spans(&[Span::bold(text.as_str())], size, 0.0);
                    w.gap(1.5);
                }
                Block::Paragraph(spans) => {
                    w.spans(spans, BODY_SIZE, 0.0);
                    w.gap(2.5);
                }
                Block::Bullets(items) => {
                    for item in items {
                        let mut spans = vec![Span::plain("-")];
                        spans.extend(item.iter().cloned());
                        w.spans(&spans, BODY_SIZE, 4.0);
                    }
                    w.gap(2.5);
                }
                Block::Quote(text) => {
                    for line in text.lines() {
                        w.spans(&parse_inline(line), BODY_SIZE, 8.0);
                    }
                    w.gap(2.5);
                }
                Block::Table { table, digits } => {
                    w.table(table.headers(), &table.formatted_rows(*digits));
                    w.gap(3.0);
                }
                Block::Figure { path, caption } => {
                    let note = format!("Figure: {caption} ({})", path.display());
                    w.spans(&[Span::plain(note)], 9.0, 0.0);
                    w.gap(2.5);
                }
                Block::Rule => w.rule(),
                Block::Footer(text) => w.spans(&[Span::plain(text.as_str())], 8.0, 0.0),
            }
        }
        w.finish()
    }

    /// Write the PDF rendering to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn write_pdf(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_pdf_bytes()?)?;
        tracing::info!(path = %path.display(), "Saved PDF report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use rstest::rstest;

    #[rstest]
    #[case("plain ascii", "plain ascii")]
    #[case("R\u{00B2} \u{2265} 0.5", "R^2 >= 0.5")]
    #[case("\u{03B2}_UMD \u{2014} loading", "beta_UMD - loading")]
    #[case("\u{201C}momentum\u{201D}", "\"momentum\"")]
    #[case("\u{4E2D}", "?")]
    fn ascii_folding(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(fold_to_ascii(input), expected);
    }

    #[test]
    fn wrap_respects_width() {
        let spans = parse_inline("alpha beta **gamma** delta epsilon zeta eta theta");
        let width = text_width("alpha beta gamma", 10.0, true);
        let lines = wrap_spans(&spans, 10.0, width);
        assert!(lines.len() > 1);
        for line in &lines {
            let text: Vec<_> = line.iter().map(|w| w.text.as_str()).collect();
            assert!(text_width(&text.join(" "), 10.0, true) <= width + 1e-3 || line.len() == 1);
        }
        let gamma = lines.iter().flatten().find(|w| w.text == "gamma").unwrap();
        assert!(gamma.bold);
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let lines = wrap_spans(&[Span::plain("a supercalifragilistic b")], 10.0, 5.0);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn truncate_cells() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abcd..");
    }

    #[test]
    fn renders_multi_page_pdf() {
        let mut table = Table::new(["Model", "Beta", "R-squared"]);
        for i in 0..80 {
            table
                .push_row(vec![format!("Model {i}").into(), 0.5.into(), 0.25.into()])
                .unwrap();
        }
        let mut doc = ReportDocument::new();
        doc.title("Smart Beta \u{2014} Report")
            .heading(1, "Results")
            .paragraph("The **UMD** beta is 0.27.")
            .table(table, 3)
            .figure("fig.svg", "Diagnostics")
            .footer("end");
        let bytes = doc.to_pdf_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
