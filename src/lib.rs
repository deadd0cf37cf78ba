//! # Digesta
//!
//! One-shot article analysis against a local or remote chat-completion endpoint.
//!
//! ## Features
//!
//! - **Structured Intelligence**: typed table of contents and keyword extraction via JSON-schema output
//! - **Scripted Summaries**: a two-turn conversation primes the model before asking for the summary
//! - **Markdown Reports**: delivered as plain + HTML email over SMTP, or saved to disk
//! - **Any Source**: stdin, `$EDITOR`, text/PDF/PPTX files, or a web page

pub mod agent;
pub mod analysis;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod mailer;
pub mod pipeline;
pub mod report;
pub mod scraper;
pub mod source;
pub mod ui;

pub use analysis::{KeywordExtraction, KeywordItem, TableOfContents, TocItem};
pub use config::Config;
pub use pipeline::Pipeline;
pub use report::Report;
