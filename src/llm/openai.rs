//! OpenAI-compatible LLM client implementation.
//!
//! Implements the LlmClient trait for any chat-completions endpoint speaking
//! the OpenAI wire format (Groq by default).

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::error::{ChatError, Result};
use crate::llm::types::{LlmResponse, Message, ToolCall, ToolDefinition};
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of retry attempts for transient errors.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// OpenAI-compatible client configuration.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key for bearer authentication.
    pub api_key: String,
    /// Model to use (e.g., "llama-3.3-70b-versatile").
    pub model: String,
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAiConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.1,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self::new("", DEFAULT_MODEL)
    }
}

/// OpenAI-compatible LLM client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn build_request<'a>(
        &'a self,
        messages: &[Message],
        tools: &'a [ToolDefinition],
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: convert_messages(messages),
            temperature: self.config.temperature,
            stream,
            tools: tools
                .iter()
                .map(|t| WireTool {
                    kind: "function",
                    function: WireToolFunction {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
        }
    }

    /// Sends a chat-completions request, retrying transient failures.
    async fn send_with_retry(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let url = self.endpoint("chat/completions");
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            debug!(
                model = %self.config.model,
                stream = request.stream,
                tools = request.tools.len(),
                "Chat completion request attempt {} of {}",
                attempt,
                MAX_RETRY_ATTEMPTS
            );

            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(request)
                .send()
                .await;

            let (error, is_retryable) = match result {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    Self::parse_error(status, &body)
                }
                Err(e) => (
                    Self::map_request_error(&e),
                    Self::is_retryable_request_error(&e),
                ),
            };

            if !is_retryable || attempt >= MAX_RETRY_ATTEMPTS {
                return Err(error);
            }

            warn!(
                "Chat completion request failed (attempt {}), retrying in {:?}: {}",
                attempt, delay, error
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
            attempt += 1;
        }
    }

    /// Parses an API error response and returns (error, is_retryable).
    fn parse_error(status: StatusCode, body: &str) -> (ChatError, bool) {
        if status == StatusCode::UNAUTHORIZED {
            return (
                ChatError::auth("The model endpoint rejected the API key."),
                false,
            );
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return (ChatError::llm("Rate limited. Please wait and try again."), true);
        }

        let is_retryable = status.is_server_error();

        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
            return (
                ChatError::llm(format!("API error: {}", error_response.error.message)),
                is_retryable,
            );
        }

        (
            ChatError::llm(format!("API error ({}): {}", status, body)),
            is_retryable,
        )
    }

    fn map_request_error(error: &reqwest::Error) -> ChatError {
        if error.is_timeout() {
            ChatError::llm("Request timed out. Try again.")
        } else if error.is_connect() {
            ChatError::llm("Failed to connect to the model endpoint. Check your network.")
        } else {
            ChatError::llm(format!("Request failed: {}", error))
        }
    }

    /// Determines if a request error is retryable.
    fn is_retryable_request_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        Ok(self.complete_with_tools(messages, &[]).await?.content)
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools, false);
        let response = self.send_with_retry(&request).await?;

        let body = response
            .text()
            .await
            .map_err(|e| ChatError::llm(format!("Failed to read response: {}", e)))?;
        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::llm(format!("Failed to parse response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.into_response())
            .ok_or_else(|| ChatError::llm("No response from the model"))
    }

    async fn complete_with_tools_streaming(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_text: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools, true);
        let response = self.send_with_retry(&request).await?;

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut accumulator = StreamAccumulator::default();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| ChatError::llm(format!("Stream error: {}", e)))?;
            buffer.extend_from_slice(&bytes);

            for data in drain_sse_data(&mut buffer) {
                if data == "[DONE]" {
                    return Ok(accumulator.finish());
                }
                match serde_json::from_str::<StreamEvent>(&data) {
                    Ok(event) => {
                        if let Some(text) = accumulator.apply(event) {
                            on_text(&text);
                        }
                    }
                    Err(e) => debug!("Skipping unparseable stream event: {}", e),
                }
            }
        }

        Ok(accumulator.finish())
    }

    async fn check_auth(&self, timeout: Duration) -> Result<()> {
        let result = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .timeout(timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("API key accepted");
                Ok(())
            }
            Ok(response)
                if matches!(
                    response.status(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) =>
            {
                Err(ChatError::auth("Please enter a valid API key"))
            }
            Ok(response) => Err(ChatError::auth(format!(
                "Could not verify API key: endpoint returned {}",
                response.status()
            ))),
            Err(e) if e.is_timeout() => Err(ChatError::auth(format!(
                "Could not verify API key: no response within {}s",
                timeout.as_secs()
            ))),
            Err(e) => Err(ChatError::auth(format!("Could not verify API key: {}", e))),
        }
    }
}

/// Converts internal messages to the wire format.
fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str().to_string(),
            content: if m.content.is_empty() && !m.tool_calls.is_empty() {
                None
            } else {
                Some(m.content.clone())
            },
            tool_calls: if m.tool_calls.is_empty() {
                None
            } else {
                Some(
                    m.tool_calls
                        .iter()
                        .map(|c| WireToolCall {
                            id: c.id.clone(),
                            kind: "function".to_string(),
                            function: WireFunction {
                                name: c.name.clone(),
                                arguments: c.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: m.tool_call_id.clone(),
        })
        .collect()
}

/// Removes every complete line from `buffer` and returns the SSE `data:` payloads.
///
/// A trailing partial line stays in the buffer for the next chunk.
fn drain_sse_data(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line);
        if let Some(data) = line.trim().strip_prefix("data:") {
            let data = data.trim();
            if !data.is_empty() {
                payloads.push(data.to_string());
            }
        }
    }

    payloads
}

/// Reassembles a streamed response from its deltas.
#[derive(Debug, Default)]
struct StreamAccumulator {
    content: String,
    tool_calls: Vec<PartialToolCall>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl StreamAccumulator {
    /// Applies one event and returns its text delta, if any.
    fn apply(&mut self, event: StreamEvent) -> Option<String> {
        let delta = event.choices.into_iter().next()?.delta;

        for call in delta.tool_calls.unwrap_or_default() {
            if self.tool_calls.len() <= call.index {
                self.tool_calls
                    .resize_with(call.index + 1, PartialToolCall::default);
            }
            let partial = &mut self.tool_calls[call.index];
            if let Some(id) = call.id {
                partial.id = Some(id);
            }
            if let Some(function) = call.function {
                if let Some(name) = function.name {
                    partial.name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    partial.arguments.push_str(&arguments);
                }
            }
        }

        match delta.content {
            Some(text) if !text.is_empty() => {
                self.content.push_str(&text);
                Some(text)
            }
            _ => None,
        }
    }

    fn finish(self) -> LlmResponse {
        let tool_calls = self
            .tool_calls
            .into_iter()
            .enumerate()
            .filter(|(_, call)| !call.name.is_empty())
            .map(|(index, call)| ToolCall {
                id: call.id.unwrap_or_else(|| format!("call_{index}")),
                name: call.name,
                arguments: call.arguments,
            })
            .collect();
        LlmResponse::with_tool_calls(self.content, tool_calls)
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn into_response(self) -> LlmResponse {
        let tool_calls = self
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall {
                id: c.id,
                name: c.function.name,
                arguments: c.function.arguments,
            })
            .collect();
        LlmResponse::with_tool_calls(self.content.unwrap_or_default(), tool_calls)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

#[derive(Debug, Deserialize)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
