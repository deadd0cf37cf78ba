//! LLM agent module: summary, table of contents and keyword extraction.
//!
//! Each operation is a self-contained round trip against the chat endpoint and
//! returns a `Result`; deciding whether a failure is fatal is left to the caller.

use crate::analysis::{KeywordExtraction, TableOfContents};
use crate::conversation::{Conversation, TurnTemplate};
use crate::llm::{ChatClient, ChatMessage, LlmError, SamplingParams};
use thiserror::Error;

/// Stop sequence for ChatML-style local models
const STOP_SEQUENCE: &str = "<|im_end|>";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model output failed validation: {0}")]
    Validation(String),
    #[error("model returned an empty reply")]
    EmptyReply,
}

/// Sampling used for both summary turns
pub fn summary_sampling() -> SamplingParams {
    SamplingParams {
        temperature: Some(0.3),
        frequency_penalty: Some(1.45),
        max_tokens: Some(1200),
        stop: vec![STOP_SEQUENCE.to_string()],
    }
}

/// The two-turn summary script: prime with the article, then ask for the summary
pub fn summary_script(article: &str) -> [TurnTemplate; 2] {
    [
        TurnTemplate::acknowledge(format!(
            r#"Read the following article carefully. When you're done, say "I am ready".

[Start of article]
{}
[End of article]"#,
            article
        )),
        TurnTemplate::capture(
            r#"Now, write a short, clear summary in plain English, no jargon.

Then, list exactly 3 key points.

Finally, tell me: does the author have a critique or unique angle? What's their stance?"#,
        ),
    ]
}

/// Run the summary script and return the whole conversation, along with the
/// reply to the capturing turn
pub async fn summary_conversation(
    client: &ChatClient,
    article: &str,
) -> Result<(Conversation, Option<String>), AgentError> {
    let mut conversation = Conversation::new();
    let captured = conversation
        .run_script(client, &summary_script(article), &summary_sampling())
        .await?;
    Ok((conversation, captured))
}

/// Generate a plain-English summary with 3 key points and the author's stance
pub async fn gen_summary(client: &ChatClient, article: &str) -> Result<String, AgentError> {
    let (_, captured) = summary_conversation(client, article).await?;
    match captured {
        Some(reply) if !reply.trim().is_empty() => Ok(reply),
        _ => Err(AgentError::EmptyReply),
    }
}

/// Extract `count` conceptual keywords with relevance scores and justifications
pub async fn extract_keywords(
    client: &ChatClient,
    article: &str,
    count: usize,
) -> Result<KeywordExtraction, AgentError> {
    let messages = [
        ChatMessage::system(format!(
            "You are a semantic analyst. Identify the {} most important conceptual keywords \
             in the article. Focus on novelty, centrality, and technical significance.",
            count
        )),
        ChatMessage::user(format!(
            r#"Analyze the following article and extract exactly {} keywords that capture its core ideas.

Rules:
- Prioritize technical terms, novel concepts, and recurring themes.
- Avoid generic words like 'AI', 'system', 'approach'.
- Each keyword must be justified by its role in the article.
- The 'relevance' score must be a decimal number (float) between 0.0 and 1.0.
- Return only valid JSON matching the schema.

{}"#,
            count,
            wrap_article(article)
        )),
    ];

    let result: KeywordExtraction = client.complete_structured(&messages, Some(0.3)).await?;
    result.validate(count).map_err(AgentError::Validation)?;
    Ok(result)
}

/// Extract the main sections of the article in document order
pub async fn generate_toc(
    client: &ChatClient,
    article: &str,
) -> Result<TableOfContents, AgentError> {
    let messages = [
        ChatMessage::system(
            "You are a precision editor. Extract the logical structure of the article \
             and return ONLY a well-formed TableOfContents.",
        ),
        ChatMessage::user(format!(
            r#"Analyze the following article and generate a clear, hierarchical Table of Contents.

Rules:
- Report only the main sections.
- Titles must reflect actual content, not generic labels.
- Each key idea must capture the essence in plain English.
- Return nothing but valid JSON matching the schema.

{}"#,
            wrap_article(article)
        )),
    ];

    let toc: TableOfContents = client.complete_structured(&messages, None).await?;
    if toc.is_empty() {
        return Err(AgentError::Validation(
            "table of contents has no items".to_string(),
        ));
    }
    Ok(toc)
}

/// Embed the article verbatim between sentinel markers
fn wrap_article(article: &str) -> String {
    format!("[Start of Article]\n{}\n[End of Article]", article)
}
