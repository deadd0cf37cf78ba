//! Structured outputs requested from the LLM.
//!
//! The JSON schemas sent to the endpoint are derived from these types, so the
//! doc comments double as field descriptions for the model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A keyword the model considers central to the article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeywordItem {
    /// The actual keyword or phrase
    pub word: String,
    /// How central this concept is to the article (0.0 to 1.0)
    #[schemars(range(min = 0.0, max = 1.0))]
    pub relevance: f64,
    /// One-sentence explanation of why this keyword matters
    pub reason: String,
}

/// Keyword extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeywordExtraction {
    /// Most meaningful keywords, in order of relevance
    pub keywords: Vec<KeywordItem>,
}

impl KeywordExtraction {
    /// Check the result against the requested cardinality and relevance range
    pub fn validate(&self, expected: usize) -> Result<(), String> {
        if self.keywords.len() != expected {
            return Err(format!(
                "expected {} keywords, got {}",
                expected,
                self.keywords.len()
            ));
        }
        if let Some(kw) = self
            .keywords
            .iter()
            .find(|kw| !(0.0..=1.0).contains(&kw.relevance))
        {
            return Err(format!(
                "relevance {} for '{}' is outside [0, 1]",
                kw.relevance, kw.word
            ));
        }
        Ok(())
    }
}

/// One main section of the article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TocItem {
    /// The exact heading text
    pub title: String,
    /// One-sentence summary of what this section is really about
    pub key_idea: String,
}

/// Table of contents in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableOfContents {
    /// List of all sections in order
    pub items: Vec<TocItem>,
}

impl TableOfContents {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
