//! Tool-calling agent loop.
//!
//! The model is offered the SQL tools and called repeatedly until it answers
//! without requesting a tool, or the iteration limit is reached.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::prompt;
use super::tools::{self, SqlToolbox};
use super::{AgentEvent, EventSink, SqlAgent};
use crate::db::DatabaseClient;
use crate::error::{ChatError, Result};
use crate::llm::{LlmClient, LlmResponse, Message, ToolDefinition};

/// Default maximum number of model calls per question.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// SQL agent that drives the model through tool calls.
pub struct ToolCallingAgent {
    llm: Arc<dyn LlmClient>,
    toolbox: SqlToolbox,
    tools: Vec<ToolDefinition>,
    streaming: bool,
    max_iterations: usize,
}

impl ToolCallingAgent {
    /// Creates a non-streaming agent over `db`.
    pub fn new(llm: Arc<dyn LlmClient>, db: Arc<dyn DatabaseClient>) -> Self {
        Self {
            toolbox: SqlToolbox::new(db, Arc::clone(&llm)),
            llm,
            tools: tools::definitions(),
            streaming: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Enables or disables token streaming.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Sets the maximum number of model calls per question.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    async fn call_model(
        &self,
        messages: &[Message],
        sink: &mut dyn EventSink,
    ) -> Result<LlmResponse> {
        let response = if self.streaming {
            let mut on_text = |text: &str| sink.emit(AgentEvent::Token(text.to_string()));
            self.llm
                .complete_with_tools_streaming(messages, &self.tools, &mut on_text)
                .await
        } else {
            self.llm.complete_with_tools(messages, &self.tools).await
        };

        response.map_err(|e| match e {
            ChatError::Query(_) => e,
            other => ChatError::query(other.to_string()),
        })
    }
}

#[async_trait]
impl SqlAgent for ToolCallingAgent {
    async fn answer(&self, question: &str, sink: &mut dyn EventSink) -> Result<String> {
        let mut messages = vec![
            Message::system(prompt::system_prompt(self.toolbox.dialect())),
            Message::user(question),
        ];

        for iteration in 1..=self.max_iterations {
            debug!(iteration, "Calling model");
            let response = self.call_model(&messages, sink).await?;

            if !response.has_tool_calls() {
                let answer = response.content.trim();
                if answer.is_empty() {
                    return Err(ChatError::query("The model returned an empty answer"));
                }
                info!(iterations = iteration, "Agent produced an answer");
                return Ok(answer.to_string());
            }

            if !self.streaming && !response.content.trim().is_empty() {
                sink.emit(AgentEvent::Thought(response.content.trim().to_string()));
            }

            messages.push(Message::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                sink.emit(AgentEvent::ToolCall {
                    tool: call.name.clone(),
                    input: call.arguments.clone(),
                });

                let output = match self.toolbox.run(call).await {
                    Ok(output) => output,
                    Err(err) => {
                        warn!(tool = %call.name, error = %err, "Tool call failed");
                        format!("Error: {err}")
                    }
                };

                sink.emit(AgentEvent::ToolResult {
                    tool: call.name.clone(),
                    output: output.clone(),
                });
                messages.push(Message::tool(call.id.clone(), output));
            }
        }

        warn!(limit = self.max_iterations, "Agent hit the iteration limit");
        Err(ChatError::query(format!(
            "Agent stopped due to iteration limit ({} steps)",
            self.max_iterations
        )))
    }
}
