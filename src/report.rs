//! Markdown report assembly.

use crate::analysis::{KeywordExtraction, TableOfContents};
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUMMARY_PLACEHOLDER: &str = "_Could not generate summary._";
pub const TOC_PLACEHOLDER: &str = "_Could not generate table of contents._";
pub const KEYWORDS_PLACEHOLDER: &str = "_Could not extract keywords._";

/// A finished Markdown report. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    markdown: String,
}

impl Report {
    pub fn as_str(&self) -> &str {
        &self.markdown
    }

    pub fn into_string(self) -> String {
        self.markdown
    }

    /// Write the report to `path`, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.markdown)
    }

    /// Save to a temporary `.md` file that outlives the process
    pub fn save_temp(&self) -> std::io::Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix("digesta-report-")
            .suffix(".md")
            .tempfile()?;
        file.write_all(self.markdown.as_bytes())?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.markdown)
    }
}

/// Builds a [`Report`] section by section, in order.
#[derive(Debug)]
pub struct ReportBuilder {
    buf: String,
}

impl ReportBuilder {
    pub fn new(generated_at: NaiveDateTime) -> Self {
        let mut buf = String::from("# Article Analysis Report\n\n");
        let _ = writeln!(buf, "_Generated on {}_\n", generated_at.format("%Y-%m-%d %H:%M"));
        Self { buf }
    }

    /// Summary section; the text is Markdown produced by the model
    pub fn summary(mut self, summary: Option<&str>) -> Self {
        self.buf.push_str("## Summary\n\n");
        match summary {
            Some(text) => {
                self.buf.push_str(text.trim());
                self.buf.push_str("\n\n");
            }
            None => {
                self.buf.push_str(SUMMARY_PLACEHOLDER);
                self.buf.push_str("\n\n");
            }
        }
        self
    }

    pub fn table_of_contents(mut self, toc: Option<&TableOfContents>) -> Self {
        self.buf.push_str("## Table of Contents\n\n");
        match toc {
            Some(toc) => {
                for item in &toc.items {
                    let _ = writeln!(
                        self.buf,
                        "- **{}**\n  → {}\n",
                        escape_inline(&item.title),
                        escape_inline(&item.key_idea)
                    );
                }
            }
            None => {
                self.buf.push_str(TOC_PLACEHOLDER);
                self.buf.push_str("\n\n");
            }
        }
        self
    }

    pub fn keywords(mut self, keywords: Option<&KeywordExtraction>) -> Self {
        self.buf.push_str("## Keywords\n\n");
        match keywords {
            Some(result) => {
                for (i, kw) in result.keywords.iter().enumerate() {
                    let _ = writeln!(
                        self.buf,
                        "{}. **{}** ({:.2})\n   → {}\n",
                        i + 1,
                        escape_inline(&kw.word),
                        kw.relevance,
                        escape_inline(&kw.reason)
                    );
                }
            }
            None => {
                self.buf.push_str(KEYWORDS_PLACEHOLDER);
                self.buf.push_str("\n\n");
            }
        }
        self
    }

    pub fn footer(mut self, elapsed: Duration) -> Self {
        let _ = writeln!(self.buf, "---\n\n_Completed in {}_", format_elapsed(elapsed));
        self
    }

    pub fn finish(self) -> Report {
        Report { markdown: self.buf }
    }
}

/// Inputs of one report, as produced by the generation stages
#[derive(Debug, Clone, Default)]
pub struct Sections {
    pub summary: Option<String>,
    pub toc: Option<TableOfContents>,
    pub keywords: Option<KeywordExtraction>,
}

/// Assemble all sections in the fixed order
pub fn assemble(sections: &Sections, generated_at: NaiveDateTime, elapsed: Duration) -> Report {
    ReportBuilder::new(generated_at)
        .summary(sections.summary.as_deref())
        .table_of_contents(sections.toc.as_ref())
        .keywords(sections.keywords.as_ref())
        .footer(elapsed)
        .finish()
}

/// Format a duration as seconds with one decimal, e.g. `12.3s`
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Escape model text for use inside a single Markdown line.
///
/// Whitespace (including newlines) collapses to single spaces, and characters
/// that would start emphasis, links, code, HTML or tables are backslash-escaped.
pub fn escape_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, word) in text.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        for c in word.chars() {
            if matches!(
                c,
                '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '#' | '|' | '~' | '!'
            ) {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}
