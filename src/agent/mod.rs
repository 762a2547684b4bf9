//! SQL agent for SQLChat.
//!
//! An agent answers one natural-language question against one database,
//! issuing SQL through tools and reporting its progress as [`AgentEvent`]s.

mod executor;
mod factory;
mod prompt;
pub mod tools;

pub use executor::ToolCallingAgent;
pub use factory::AgentFactory;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Progress reported while an agent works on a question.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The agent invoked a tool.
    ToolCall { tool: String, input: String },
    /// A tool returned (errors included, prefixed with `Error:`).
    ToolResult { tool: String, output: String },
    /// Model text emitted alongside tool calls (non-streaming mode only).
    Thought(String),
    /// A streamed fragment of model text.
    ///
    /// Fragments preceding a `ToolCall` belong to that step; fragments after
    /// the last `ToolResult` form the final answer.
    Token(String),
}

/// Receives agent events in order.
pub trait EventSink: Send {
    fn emit(&mut self, event: AgentEvent);
}

impl<F> EventSink for F
where
    F: FnMut(AgentEvent) + Send,
{
    fn emit(&mut self, event: AgentEvent) {
        self(event)
    }
}

impl EventSink for mpsc::UnboundedSender<AgentEvent> {
    fn emit(&mut self, event: AgentEvent) {
        // The receiver going away only means nobody is watching anymore.
        let _ = self.send(event);
    }
}

impl EventSink for Vec<AgentEvent> {
    fn emit(&mut self, event: AgentEvent) {
        self.push(event);
    }
}

/// Answers natural-language questions about a database.
///
/// Each call is independent: no state is carried between questions.
#[async_trait]
pub trait SqlAgent: Send + Sync {
    /// Answers `question`, emitting events to `sink` before returning.
    ///
    /// Fails with `Query` if no answer could be produced.
    async fn answer(&self, question: &str, sink: &mut dyn EventSink) -> Result<String>;
}
