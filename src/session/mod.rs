//! Per-session state for SQLChat.
//!
//! A [`Session`] is created once a connection has been validated and probed
//! and an agent has been built. It owns the transcript, the audit log and the
//! turn state machine; nothing in it is shared between sessions.

pub mod state;
pub mod turn;

pub use state::{AuditEntry, AuditLog, Conversation, Role, Turn, AUDIT_PREVIEW_ENTRIES, GREETING};
pub use turn::{PendingTurn, TurnHandler, TurnOutcome, TurnState};

use std::sync::Arc;

use tracing::info;

use crate::agent::{EventSink, SqlAgent};
use crate::config::ConnectionConfig;
use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::inspect::TablePreview;

/// A live chat session against one database.
pub struct Session {
    connection: ConnectionConfig,
    tables: Vec<String>,
    previews: Vec<TablePreview>,
    schema_error: Option<String>,
    conversation: Conversation,
    audit: AuditLog,
    turns: TurnHandler,
}

impl Session {
    pub fn new(
        connection: ConnectionConfig,
        agent: Arc<dyn SqlAgent>,
        tables: Vec<String>,
        previews: Vec<TablePreview>,
        max_audit_entries: usize,
    ) -> Self {
        Self {
            connection,
            tables,
            previews,
            schema_error: None,
            conversation: Conversation::new(),
            audit: AuditLog::new(max_audit_entries),
            turns: TurnHandler::new(agent),
        }
    }

    /// Records that the table listing failed at startup.
    pub fn with_schema_error(mut self, message: impl Into<String>) -> Self {
        self.schema_error = Some(message.into());
        self
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.connection.backend()
    }

    /// Tables found when the session started.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Sample rows taken when the session started.
    pub fn previews(&self) -> &[TablePreview] {
        &self.previews
    }

    /// Why the tables could not be listed, if they could not.
    pub fn schema_error(&self) -> Option<&str> {
        self.schema_error.as_deref()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn turn_state(&self) -> TurnState {
        self.turns.state()
    }

    /// Accepts a question; see [`TurnHandler::begin`].
    pub fn submit(&mut self, question: &str) -> Result<Option<PendingTurn>> {
        self.turns.begin(&mut self.conversation, question)
    }

    /// Records an answer; see [`TurnHandler::finish`].
    pub fn complete(&mut self, outcome: TurnOutcome) -> &Turn {
        self.turns
            .finish(&mut self.conversation, &mut self.audit, outcome)
    }

    /// Asks one question end to end.
    pub async fn ask(&mut self, question: &str, sink: &mut dyn EventSink) -> Result<Option<Turn>> {
        self.turns
            .handle(&mut self.conversation, &mut self.audit, question, sink)
            .await
    }

    /// Resets the transcript to the greeting. The audit log is untouched.
    pub fn clear_chat(&mut self) {
        self.conversation.clear();
        info!("Chat history cleared");
    }

    /// Empties the audit log. The transcript is untouched.
    pub fn clear_audit(&mut self) {
        self.audit.clear();
        info!("Audit log cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentEvent;
    use crate::error::ChatError;
    use async_trait::async_trait;

    struct EchoAgent;

    #[async_trait]
    impl SqlAgent for EchoAgent {
        async fn answer(&self, question: &str, _sink: &mut dyn EventSink) -> Result<String> {
            if question.contains("fail") {
                Err(ChatError::query("no such table: COURSE"))
            } else {
                Ok(format!("You asked: {question}"))
            }
        }
    }

    fn session() -> Session {
        Session::new(
            ConnectionConfig::embedded("student.db"),
            Arc::new(EchoAgent),
            vec!["STUDENT".to_string()],
            Vec::new(),
            50,
        )
    }

    #[tokio::test]
    async fn test_resets_are_independent() {
        let mut session = session();
        let mut events: Vec<AgentEvent> = Vec::new();
        session.ask("How many students?", &mut events).await.unwrap();
        session.ask("Please fail", &mut events).await.unwrap();
        assert_eq!(session.conversation().len(), 5);
        assert_eq!(session.audit().len(), 1);

        session.clear_chat();
        assert_eq!(session.conversation().turns(), &[Turn::assistant(GREETING)]);
        assert_eq!(session.audit().len(), 1);

        session.ask("Top student?", &mut events).await.unwrap();
        session.clear_audit();
        assert!(session.audit().is_empty());
        assert_eq!(session.conversation().len(), 3);
    }

    #[tokio::test]
    async fn test_submit_then_complete() {
        let mut session = session();
        let pending = session.submit("Who is first?").unwrap().unwrap();
        assert_eq!(session.turn_state(), TurnState::AwaitingAnswer);
        assert_eq!(session.conversation().last(), Some(&Turn::user("Who is first?")));

        let outcome = pending.run(&mut Vec::<AgentEvent>::new()).await;
        let turn = session.complete(outcome);
        assert_eq!(turn.content, "You asked: Who is first?");
        assert_eq!(session.turn_state(), TurnState::Idle);
    }
}
