//! Report delivery by email.
//!
//! Renders the Markdown report to HTML with pulldown-cmark and sends a
//! `multipart/alternative` message (plain Markdown + HTML) through lettre.

use crate::config::MailSettings;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid address \"{address}\": {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("mail task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Render Markdown to HTML.
///
/// Tables, footnotes, strikethrough and task lists are enabled. Fenced code
/// keeps its language as a `language-*` class for highlighting by the mail
/// client. Raw HTML in the source is emitted as escaped text.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
            // Only the first word of the info string names the language
            let lang = lang.split_whitespace().next().unwrap_or_default().to_string();
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(CowStr::from(lang))))
        }
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

/// Build the two-part message
pub fn build_message(
    settings: &MailSettings,
    subject: &str,
    markdown: &str,
) -> Result<Message, MailError> {
    let html = markdown_to_html(markdown);

    let message = Message::builder()
        .from(parse_mailbox(&settings.sender)?)
        .to(parse_mailbox(&settings.recipient)?)
        .subject(subject)
        .multipart(MultiPart::alternative_plain_html(markdown.to_string(), html))?;
    Ok(message)
}

/// Send the report over SMTP with implicit TLS.
///
/// The transport is not pooled: the session is opened, authenticated, used
/// and closed within this call whether or not the send succeeds.
pub async fn send_report(
    settings: &MailSettings,
    subject: &str,
    markdown: &str,
) -> Result<(), MailError> {
    let message = build_message(settings, subject, markdown)?;
    let settings = settings.clone();

    tokio::task::spawn_blocking(move || -> Result<(), MailError> {
        let transport = SmtpTransport::relay(&settings.server)?
            .port(settings.port)
            .credentials(Credentials::new(settings.sender, settings.password))
            .build();
        transport.send(&message)?;
        Ok(())
    })
    .await??;

    tracing::info!("report emailed");
    Ok(())
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{KeywordExtraction, KeywordItem, TableOfContents, TocItem};
    use crate::report::{assemble, Sections};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn settings(server: &str, port: u16) -> MailSettings {
        MailSettings {
            sender: "reports@example.com".into(),
            password: "abcd efgh ijkl mnop".into(),
            recipient: "reader@example.com".into(),
            server: server.into(),
            port,
        }
    }

    #[test]
    fn renders_tables_and_code_language() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n```rust ignore\nfn main() {}\n```\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains(r#"<code class="language-rust">"#));
    }

    #[test]
    fn raw_html_is_neutralised() {
        let html = markdown_to_html("Hello <script>alert(1)</script>\n\n<div>block</div>\n");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<div>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn html_keeps_keywords_and_titles() {
        let sections = Sections {
            summary: Some("The article argues for *small* tools.".into()),
            toc: Some(TableOfContents {
                items: vec![
                    TocItem {
                        title: "Why small tools win".into(),
                        key_idea: "Composability beats features.".into(),
                    },
                    TocItem {
                        title: "Counterarguments".into(),
                        key_idea: "Integration costs are real.".into(),
                    },
                ],
            }),
            keywords: Some(KeywordExtraction {
                keywords: ["composability", "unix philosophy", "integration cost"]
                    .iter()
                    .map(|w| KeywordItem {
                        word: w.to_string(),
                        relevance: 0.8,
                        reason: "recurs".into(),
                    })
                    .collect(),
            }),
        };
        let at = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 0)
            .unwrap();
        let report = assemble(&sections, at, Duration::from_secs(1));
        let html = markdown_to_html(report.as_str());

        for needle in [
            "composability",
            "unix philosophy",
            "integration cost",
            "Why small tools win",
            "Counterarguments",
        ] {
            assert!(html.contains(needle), "missing {needle} in {html}");
        }
        assert!(html.contains("<ol>"));
    }

    #[test]
    fn message_has_plain_and_html_parts() {
        let message = build_message(&settings("smtp.example.com", 465), "Report", "# Title\n")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("Subject: Report"));
        assert!(raw.contains("To: reader@example.com"));
    }

    #[test]
    fn invalid_sender_is_an_address_error() {
        let mut bad = settings("smtp.example.com", 465);
        bad.sender = "not an address".into();
        let err = build_message(&bad, "Report", "body").unwrap_err();
        assert!(matches!(err, MailError::Address { .. }));
    }

    #[tokio::test]
    async fn unreachable_server_fails_without_touching_report() {
        let report = "# Report\n\nUnchanged body.\n".to_string();
        let before = report.clone();

        let result = send_report(&settings("127.0.0.1", 1), "Report", &report).await;

        assert!(result.is_err());
        assert_eq!(report, before);
    }
}
