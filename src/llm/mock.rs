//! Mock LLM client for testing.
//!
//! Replays a script of responses, falling back to pattern-matched answers once
//! the script runs out.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ChatError, Result};
use crate::llm::types::{LlmResponse, Message, Role, ToolCall, ToolDefinition};
use crate::llm::LlmClient;

/// Mock LLM client that returns scripted or canned responses.
///
/// Used for unit testing without making real API calls.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Responses returned in order, one per completion call.
    script: Mutex<VecDeque<Result<LlmResponse>>>,
    /// Custom response mappings (pattern -> response) used once the script is empty.
    custom_responses: Vec<(String, String)>,
    /// Every request's message list, in call order.
    requests: Mutex<Vec<Vec<Message>>>,
    /// When set, `check_auth` fails with this message.
    auth_error: Option<String>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scripted response.
    pub fn with_turn(self, response: LlmResponse) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(response));
        }
        self
    }

    /// Appends a scripted plain-text response.
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.with_turn(LlmResponse::text(content))
    }

    /// Appends a scripted response requesting a single tool call.
    pub fn with_tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        let id = format!("mock_call_{}", self.script_len() + 1);
        self.with_turn(LlmResponse::with_tool_calls(
            String::new(),
            vec![ToolCall::new(id, name, arguments.to_string())],
        ))
    }

    /// Appends a scripted failure.
    pub fn with_error(self, error: ChatError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(error));
        }
        self
    }

    /// Adds a custom response mapping.
    ///
    /// When the last user message contains `pattern`, the mock returns `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Makes `check_auth` reject the key.
    pub fn rejecting_auth(mut self, message: impl Into<String>) -> Self {
        self.auth_error = Some(message.into());
        self
    }

    /// Returns the message lists of all requests made so far.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn script_len(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or_default()
    }

    /// Generates a canned response based on the last user message.
    fn mock_response(&self, messages: &[Message]) -> String {
        let input = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.to_lowercase())
            .unwrap_or_default();

        self.custom_responses
            .iter()
            .find(|(pattern, _)| input.contains(&pattern.to_lowercase()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| "I don't know.".to_string())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        Ok(self.complete_with_tools(messages, &[]).await?.content)
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(response) => response,
            None => Ok(LlmResponse::text(self.mock_response(messages))),
        }
    }

    async fn check_auth(&self, _timeout: Duration) -> Result<()> {
        match &self.auth_error {
            Some(message) => Err(ChatError::auth(message.clone())),
            None => Ok(()),
        }
    }
}
