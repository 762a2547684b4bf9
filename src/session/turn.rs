//! Turn handling.
//!
//! A turn moves `Idle -> AwaitingAnswer -> Idle`. Starting a turn appends the
//! user's question; finishing it appends exactly one assistant turn and, on
//! success, one audit entry.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::state::{AuditEntry, AuditLog, Conversation, Turn};
use crate::agent::{EventSink, SqlAgent};
use crate::error::{ChatError, Result};

/// Prefix of the assistant turn recorded when a question fails.
pub const ERROR_PREFIX: &str = "Error processing query: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    AwaitingAnswer,
}

/// A question that has been accepted and is waiting for the agent.
///
/// Owns everything needed to run, so the caller can keep rendering the
/// session while the answer is produced.
pub struct PendingTurn {
    agent: Arc<dyn SqlAgent>,
    question: String,
}

impl PendingTurn {
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Asks the agent once, forwarding its events to `sink`.
    pub async fn run(self, sink: &mut dyn EventSink) -> TurnOutcome {
        let result = self.agent.answer(&self.question, sink).await;
        TurnOutcome {
            question: self.question,
            result,
        }
    }
}

/// The agent's reply to a [`PendingTurn`].
#[derive(Debug)]
pub struct TurnOutcome {
    pub question: String,
    pub result: Result<String>,
}

/// Drives the turn state machine for one session.
pub struct TurnHandler {
    agent: Arc<dyn SqlAgent>,
    state: TurnState,
}

impl TurnHandler {
    pub fn new(agent: Arc<dyn SqlAgent>) -> Self {
        Self {
            agent,
            state: TurnState::Idle,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TurnState::Idle
    }

    /// Accepts `question` and appends it as a user turn.
    ///
    /// Returns `Ok(None)` for a blank question. Fails if a turn is already in flight.
    pub fn begin(
        &mut self,
        conversation: &mut Conversation,
        question: &str,
    ) -> Result<Option<PendingTurn>> {
        let question = question.trim();
        if question.is_empty() {
            debug!("Ignoring blank question");
            return Ok(None);
        }
        if self.state != TurnState::Idle {
            return Err(ChatError::validation(
                "Please wait for the current answer before asking again",
            ));
        }

        conversation.push(Turn::user(question));
        self.state = TurnState::AwaitingAnswer;
        info!(chars = question.len(), "Question submitted");

        Ok(Some(PendingTurn {
            agent: Arc::clone(&self.agent),
            question: question.to_string(),
        }))
    }

    /// Records the agent's reply and returns to `Idle`.
    ///
    /// Returns the assistant turn that was appended.
    pub fn finish<'a>(
        &mut self,
        conversation: &'a mut Conversation,
        audit: &mut AuditLog,
        outcome: TurnOutcome,
    ) -> &'a Turn {
        self.state = TurnState::Idle;

        let turn = match outcome.result {
            Ok(answer) => {
                info!(chars = answer.len(), "Question answered");
                audit.push(AuditEntry::now(outcome.question, answer.clone()));
                Turn::assistant(answer)
            }
            Err(e) => {
                warn!(error = %e, "Question failed");
                Turn::assistant(format!("{ERROR_PREFIX}{}", e.message()))
            }
        };

        conversation.push(turn);
        let last = conversation.turns().len() - 1;
        &conversation.turns()[last]
    }

    /// Runs a whole turn: begin, ask the agent, finish.
    ///
    /// Returns `Ok(None)` when the question was blank.
    pub async fn handle(
        &mut self,
        conversation: &mut Conversation,
        audit: &mut AuditLog,
        question: &str,
        sink: &mut dyn EventSink,
    ) -> Result<Option<Turn>> {
        let Some(pending) = self.begin(conversation, question)? else {
            return Ok(None);
        };
        let outcome = pending.run(sink).await;
        Ok(Some(self.finish(conversation, audit, outcome).clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentEvent;
    use crate::session::state::{Role, GREETING};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed answer or error, counting invocations.
    struct ScriptedAgent {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedAgent {
        fn answering(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(answer.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SqlAgent for ScriptedAgent {
        async fn answer(&self, _question: &str, sink: &mut dyn EventSink) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sink.emit(AgentEvent::ToolCall {
                tool: "sql_db_list_tables".to_string(),
                input: "{}".to_string(),
            });
            self.reply.clone().map_err(ChatError::query)
        }
    }

    #[tokio::test]
    async fn test_successful_turn_records_answer_and_audit() {
        let agent = ScriptedAgent::answering("Two students scored above 80.");
        let mut handler = TurnHandler::new(agent.clone());
        let mut conversation = Conversation::new();
        let mut audit = AuditLog::default();
        let mut events: Vec<AgentEvent> = Vec::new();

        let turn = handler
            .handle(&mut conversation, &mut audit, "  How many scored above 80?  ", &mut events)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(turn, Turn::assistant("Two students scored above 80."));
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.turns()[1], Turn::user("How many scored above 80?"));
        assert_eq!(audit.len(), 1);
        let entry = audit.entries().next().unwrap();
        assert_eq!(entry.query, "How many scored above 80?");
        assert_eq!(entry.response, "Two students scored above 80.");
        assert_eq!(events.len(), 1);
        assert!(handler.is_idle());
    }

    #[tokio::test]
    async fn test_failed_turn_records_error_without_audit() {
        let agent = ScriptedAgent::failing("no such table: COURSE");
        let mut handler = TurnHandler::new(agent.clone());
        let mut conversation = Conversation::new();
        let mut audit = AuditLog::default();

        handler
            .handle(&mut conversation, &mut audit, "List courses", &mut Vec::<AgentEvent>::new())
            .await
            .unwrap();

        let last = conversation.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Error processing query: no such table: COURSE");
        assert!(audit.is_empty());
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
        assert!(handler.is_idle());
    }

    #[tokio::test]
    async fn test_blank_question_is_ignored() {
        let agent = ScriptedAgent::answering("unused");
        let mut handler = TurnHandler::new(agent.clone());
        let mut conversation = Conversation::new();
        let mut audit = AuditLog::default();

        let turn = handler
            .handle(&mut conversation, &mut audit, "   ", &mut Vec::<AgentEvent>::new())
            .await
            .unwrap();

        assert!(turn.is_none());
        assert_eq!(conversation.turns(), &[Turn::assistant(GREETING)]);
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_question_rejected_while_awaiting_answer() {
        let agent = ScriptedAgent::answering("Five.");
        let mut handler = TurnHandler::new(agent);
        let mut conversation = Conversation::new();
        let mut audit = AuditLog::default();

        let pending = handler.begin(&mut conversation, "How many?").unwrap().unwrap();
        assert_eq!(handler.state(), TurnState::AwaitingAnswer);

        let rejected = handler.begin(&mut conversation, "Another one?");
        assert!(matches!(rejected, Err(ChatError::Validation(_))));
        assert_eq!(conversation.len(), 2);

        let outcome = pending.run(&mut Vec::<AgentEvent>::new()).await;
        handler.finish(&mut conversation, &mut audit, outcome);
        assert!(handler.is_idle());
        assert_eq!(conversation.len(), 3);
        assert_eq!(audit.len(), 1);
    }
}
