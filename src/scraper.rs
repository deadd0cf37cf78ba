//! Article text from a web page.
//!
//! Uses reqwest for fetching and scraper for HTML parsing.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use thiserror::Error;

/// User-Agent string identifying this scraper
const USER_AGENT: &str = concat!("digesta/", env!("CARGO_PKG_VERSION"));

/// Default timeout for page fetches
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shorter blocks are usually navigation or captions
const MIN_BLOCK_CHARS: usize = 20;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("no article text found at {0}")]
    NoContent(String),
}

/// Readable content extracted from a web page
#[derive(Debug, Clone)]
pub struct WebArticle {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

impl WebArticle {
    /// Article text with the page title as its first line, ready for analysis
    pub fn into_article(self) -> String {
        match self.title {
            Some(title) => format!("{}\n\n{}", title, self.text),
            None => self.text,
        }
    }
}

/// Fetch a page and extract its article text
pub async fn fetch_content(url: &str) -> Result<WebArticle, ScraperError> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let html = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    tracing::debug!(url, bytes = html.len(), "fetched page");

    let article = parse_article(url, &html);
    if article.text.trim().is_empty() {
        return Err(ScraperError::NoContent(url.to_string()));
    }
    Ok(article)
}

/// Extract title and text from an HTML document
pub fn parse_article(url: &str, html: &str) -> WebArticle {
    let document = Html::parse_document(html);
    WebArticle {
        url: url.to_string(),
        title: extract_title(&document),
        text: extract_text(&document),
    }
}

/// Title from `<title>`, falling back to the first `<h1>`
fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].into_iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        let element = document.select(&selector).next()?;
        let title = collapse(element.text());
        (!title.is_empty()).then_some(title)
    })
}

/// Prefer a main content region; fall back to the whole document
fn extract_text(document: &Html) -> String {
    let regions = ["article", "main", "[role='main']", ".content", "#content"];

    for css in regions {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(region) = document.select(&selector).next() {
            let text = blocks_text(region);
            if !text.is_empty() {
                return text;
            }
        }
    }

    blocks_text(document.root_element())
}

/// Join paragraphs, headings and list items below `root`
fn blocks_text(root: ElementRef<'_>) -> String {
    let Ok(blocks) = Selector::parse("p, h1, h2, h3, h4, h5, h6, li") else {
        return String::new();
    };

    root.select(&blocks)
        .map(|element| collapse(element.text()))
        .filter(|block| block.chars().count() > MIN_BLOCK_CHARS)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
