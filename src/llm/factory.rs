//! LLM client factory.
//!
//! Builds the model client from the `[llm]` settings and an API key.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{ChatError, Result};
use crate::llm::{LlmClient, OpenAiClient, OpenAiConfig};

/// Creates an OpenAI-compatible client for `config`, authenticating with `api_key`.
pub fn create_client(api_key: &str, config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(ChatError::validation("Please enter your API key"));
    }

    let client = OpenAiClient::new(
        OpenAiConfig::new(api_key, config.model.clone())
            .with_base_url(config.base_url.clone())
            .with_temperature(config.temperature)
            .with_timeout(config.request_timeout_secs),
    )?;
    Ok(Arc::new(client))
}
