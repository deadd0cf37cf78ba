//! Scripted multi-turn conversations.
//!
//! A script is an ordered list of [`TurnTemplate`]s. Each turn appends the
//! instruction as a user message, sends the whole history, and appends the
//! reply. What happens with the reply is decided by the turn's [`Handling`].

use crate::llm::{ChatClient, ChatMessage, LlmError, Role, SamplingParams};

/// What to do with the assistant's reply to a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    /// Keep the reply as context only; its content is not inspected.
    Acknowledge,
    /// The reply is the script's result.
    Capture,
}

#[derive(Debug, Clone)]
pub struct TurnTemplate {
    pub instruction: String,
    pub handling: Handling,
}

impl TurnTemplate {
    pub fn acknowledge(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            handling: Handling::Acknowledge,
        }
    }

    pub fn capture(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            handling: Handling::Capture,
        }
    }
}

/// Conversation history, appended to in order.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    history: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Content of the most recent assistant message
    pub fn last_reply(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Send one user turn and append the reply
    pub async fn send(
        &mut self,
        client: &ChatClient,
        instruction: &str,
        sampling: &SamplingParams,
    ) -> Result<&str, LlmError> {
        self.history.push(ChatMessage::user(instruction));
        let reply = match client.complete(&self.history, sampling).await {
            Ok(reply) => reply,
            Err(e) => {
                // Leave the history as it was before the failed turn
                self.history.pop();
                return Err(e);
            }
        };
        tracing::debug!(turn = self.history.len() / 2 + 1, chars = reply.len(), "assistant replied");
        self.history.push(ChatMessage::assistant(reply));
        Ok(self.last_reply().unwrap_or_default())
    }

    /// Run every turn of `script` in order.
    ///
    /// Returns the reply of the last `Capture` turn, if the script has one.
    pub async fn run_script(
        &mut self,
        client: &ChatClient,
        script: &[TurnTemplate],
        sampling: &SamplingParams,
    ) -> Result<Option<String>, LlmError> {
        let mut captured = None;
        for turn in script {
            let reply = self.send(client, &turn.instruction, sampling).await?;
            if turn.handling == Handling::Capture {
                captured = Some(reply.to_string());
            }
        }
        Ok(captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_replying(status: u16, content: &str) -> (MockServer, ChatClient) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "choices": [{ "message": { "content": content } }]
            })))
            .mount(&server)
            .await;
        let client = ChatClient::new(&LlmConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn script_alternates_user_and_assistant() {
        let (_server, client) = client_replying(200, "noted").await;
        let script = [
            TurnTemplate::acknowledge("remember this"),
            TurnTemplate::capture("now answer"),
        ];

        let mut conversation = Conversation::new();
        let result = conversation
            .run_script(&client, &script, &SamplingParams::default())
            .await
            .unwrap();

        assert_eq!(result.as_deref(), Some("noted"));
        let roles: Vec<Role> = conversation.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(conversation.history()[2].content, "now answer");
    }

    #[tokio::test]
    async fn acknowledge_only_script_captures_nothing() {
        let (_server, client) = client_replying(200, "ok").await;
        let mut conversation = Conversation::new();
        let result = conversation
            .run_script(
                &client,
                &[TurnTemplate::acknowledge("ping")],
                &SamplingParams::default(),
            )
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn failed_turn_does_not_leave_dangling_user_message() {
        let (_server, client) = client_replying(500, "").await;
        let mut conversation = Conversation::new();
        let err = conversation
            .send(&client, "hello", &SamplingParams::default())
            .await;
        assert!(err.is_err());
        assert!(conversation.is_empty());
    }
}
