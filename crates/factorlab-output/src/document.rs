//! Report document model.
//!
//! A [`ReportDocument`] is an ordered list of [`Block`]s. The same document is
//! rendered to Markdown by [`crate::markdown`] and to PDF by [`crate::pdf`],
//! so narrative text is written once.

use crate::table::Table;
use std::path::PathBuf;

/// A run of inline text, optionally bold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Text content.
    pub text: String,
    /// Render in bold.
    pub bold: bool,
}

impl Span {
    /// Plain text span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    /// Bold text span.
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

/// Split `**bold**` markup into spans. An unmatched `**` is kept as text.
pub fn parse_inline(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("**") else {
            break;
        };
        if open > 0 {
            spans.push(Span::plain(&rest[..open]));
        }
        if close > 0 {
            spans.push(Span::bold(&after[..close]));
        }
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        spans.push(Span::plain(rest));
    }
    spans
}

/// Plain text of a span list, without markup.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// One block of a report.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Document title.
    Title(String),
    /// Section heading; level 1 is the top level below the title.
    Heading {
        /// Nesting level, 1 to 3.
        level: u8,
        /// Heading text.
        text: String,
    },
    /// Paragraph of inline spans.
    Paragraph(Vec<Span>),
    /// Bulleted list; each item is a list of spans.
    Bullets(Vec<Vec<Span>>),
    /// Block quote.
    Quote(String),
    /// Table with the number of decimals for float cells.
    Table {
        /// Table content.
        table: Table,
        /// Decimals for float cells.
        digits: usize,
    },
    /// Figure reference (not embedded in PDF output).
    Figure {
        /// Path of the image, relative to the report.
        path: PathBuf,
        /// Caption text.
        caption: String,
    },
    /// Horizontal rule.
    Rule,
    /// Small closing note.
    Footer(String),
}

/// An ordered collection of report blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportDocument {
    blocks: Vec<Block>,
}

impl ReportDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Whether no blocks have been added.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Title text, if a title block exists.
    pub fn title_text(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Title(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// Append a raw block.
    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Append a title.
    pub fn title(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Title(text.into()))
    }

    /// Append a heading, clamped to levels 1..=3.
    pub fn heading(&mut self, level: u8, text: impl Into<String>) -> &mut Self {
        self.push(Block::Heading {
            level: level.clamp(1, 3),
            text: text.into(),
        })
    }

    /// Append a paragraph; `**text**` marks bold spans.
    pub fn paragraph(&mut self, text: &str) -> &mut Self {
        self.push(Block::Paragraph(parse_inline(text)))
    }

    /// Append a bullet list; `**text**` marks bold spans.
    pub fn bullets<S: AsRef<str>>(&mut self, items: impl IntoIterator<Item = S>) -> &mut Self {
        let items = items
            .into_iter()
            .map(|s| parse_inline(s.as_ref()))
            .collect();
        self.push(Block::Bullets(items))
    }

    /// Append a block quote.
    pub fn quote(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Quote(text.into()))
    }

    /// Append a table.
    pub fn table(&mut self, table: Table, digits: usize) -> &mut Self {
        self.push(Block::Table { table, digits })
    }

    /// Append a figure reference.
    pub fn figure(&mut self, path: impl Into<PathBuf>, caption: impl Into<String>) -> &mut Self {
        self.push(Block::Figure {
            path: path.into(),
            caption: caption.into(),
        })
    }

    /// Append a horizontal rule.
    pub fn rule(&mut self) -> &mut Self {
        self.push(Block::Rule)
    }

    /// Append a footer note.
    pub fn footer(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Footer(text.into()))
    }

    /// Append a paragraph telling the reader which step produces a missing
    /// section.
    pub fn placeholder(&mut self, step: &str) -> &mut Self {
        self.push(Block::Paragraph(vec![
            Span::plain("Run "),
            Span::bold(step),
            Span::plain(" to populate this section."),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plain", vec![Span::plain("plain")])]
    #[case("**all bold**", vec![Span::bold("all bold")])]
    #[case("beta is **0.27** here", vec![Span::plain("beta is "), Span::bold("0.27"), Span::plain(" here")])]
    #[case("a **b** c **d**", vec![Span::plain("a "), Span::bold("b"), Span::plain(" c "), Span::bold("d")])]
    #[case("dangling ** marker", vec![Span::plain("dangling ** marker")])]
    #[case("", vec![])]
    fn inline_markup(#[case] input: &str, #[case] expected: Vec<Span>) {
        assert_eq!(parse_inline(input), expected);
    }

    #[test]
    fn builder_appends_in_order() {
        let mut doc = ReportDocument::new();
        doc.title("Q2")
            .heading(9, "Section")
            .paragraph("text")
            .rule()
            .placeholder("umd-beta");
        assert_eq!(doc.blocks().len(), 5);
        assert_eq!(doc.title_text(), Some("Q2"));
        assert!(matches!(doc.blocks()[1], Block::Heading { level: 3, .. }));
        let Block::Paragraph(spans) = &doc.blocks()[4] else {
            panic!("expected paragraph");
        };
        assert_eq!(plain_text(spans), "Run umd-beta to populate this section.");
    }
}
