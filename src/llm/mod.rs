//! LLM integration for SQLChat.
//!
//! Provides the client trait and an implementation for OpenAI-compatible
//! chat-completions endpoints.

mod factory;
mod mock;
mod openai;
mod types;

pub use factory::create_client;
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use types::{LlmResponse, Message, Role, ToolCall, ToolDefinition};

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    ///
    /// Returns the complete response as a single string.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Generates a completion that may request calls to `tools`.
    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse>;

    /// Like [`LlmClient::complete_with_tools`], reporting text deltas to
    /// `on_text` as they arrive.
    ///
    /// The default implementation does not stream and reports the whole text once.
    async fn complete_with_tools_streaming(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_text: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<LlmResponse> {
        let response = self.complete_with_tools(messages, tools).await?;
        if !response.content.is_empty() {
            on_text(&response.content);
        }
        Ok(response)
    }

    /// Verifies that the endpoint accepts the configured API key.
    ///
    /// Fails with `Auth` if the key is rejected or cannot be verified within `timeout`.
    async fn check_auth(&self, timeout: Duration) -> Result<()>;
}
