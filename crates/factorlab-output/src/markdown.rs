//! Markdown rendering of report documents.

use crate::document::{Block, ReportDocument, Span};
use crate::error::Result;
use std::path::Path;

fn inline(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|s| {
            if s.bold {
                format!("**{}**", s.text)
            } else {
                s.text.clone()
            }
        })
        .collect()
}

impl ReportDocument {
    /// Render as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for block in self.blocks() {
            match block {
                Block::Title(t) => out.push_str(&format!("# {t}\n\n")),
                Block::Heading { level, text } => {
                    let hashes = "#".repeat(usize::from(*level) + 1);
                    out.push_str(&format!("{hashes} {text}\n\n"));
                }
                Block::Paragraph(spans) => {
                    out.push_str(&inline(spans));
                    out.push_str("\n\n");
                }
                Block::Bullets(items) => {
                    for item in items {
                        out.push_str(&format!("- {}\n", inline(item)));
                    }
                    out.push('\n');
                }
                Block::Quote(text) => {
                    for line in text.lines() {
                        out.push_str(&format!("> {line}\n"));
                    }
                    out.push('\n');
                }
                Block::Table { table, digits } => {
                    out.push_str(&table.to_markdown(*digits));
                    out.push('\n');
                }
                Block::Figure { path, caption } => {
                    let path = path.display().to_string().replace('\\', "/");
                    out.push_str(&format!("![{caption}]({path})\n\n"));
                }
                Block::Rule => out.push_str("---\n\n"),
                Block::Footer(text) => out.push_str(&format!("*{text}*\n")),
            }
        }
        out
    }

    /// Write the Markdown rendering to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_markdown(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_markdown())?;
        tracing::info!(path = %path.display(), "Saved Markdown report");
        Ok(())
    }
}
