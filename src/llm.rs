//! Client for OpenAI-compatible chat-completion endpoints.
//!
//! Speaks plain chat (with sampling controls) and structured output, where the
//! response is constrained by a JSON schema derived from a Rust type.

use crate::config::LlmConfig;
use reqwest::Client;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!("digesta/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response contained no message content")]
    EmptyResponse,
    #[error("failed to parse structured response: {0}")]
    Parse(String),
}

/// Author of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling controls; unset fields use the endpoint's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SamplingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(flatten)]
    sampling: &'a SamplingParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Handle to a chat-completion endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// Create a client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Send a conversation and return the next assistant message as free text
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingParams,
    ) -> Result<String, LlmError> {
        self.send(messages, sampling, None).await
    }

    /// Send a conversation and parse the reply into `T`, constrained by `T`'s JSON schema
    pub async fn complete_structured<T>(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<T, LlmError>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let schema = schemars::schema_for!(T);
        let format = ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaFormat {
                name: T::schema_name().into_owned(),
                schema: serde_json::to_value(&schema)
                    .map_err(|e| LlmError::Parse(e.to_string()))?,
            },
        };
        let sampling = SamplingParams {
            temperature,
            ..Default::default()
        };

        let text = self.send(messages, &sampling, Some(format)).await?;
        let cleaned = strip_markdown_json(&text);
        serde_json::from_str(&cleaned).map_err(|e| LlmError::Parse(format!("{}: {}", e, cleaned)))
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingParams,
        response_format: Option<ResponseFormat>,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            sampling,
            response_format,
        };

        tracing::debug!(endpoint = %self.endpoint, messages = messages.len(), "sending chat request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Strip markdown code block wrappers from JSON response
fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();

    // Remove ```json ... ``` or ``` ... ```
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_prefix = rest.strip_prefix("json").unwrap_or(rest);

        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim().to_string();
        }
    }

    trimmed.to_string()
}
