//! Session tests: startup pipeline and turns over the sample database.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use sqlchat::agent::AgentEvent;
use sqlchat::app::Orchestrator;
use sqlchat::config::Config;
use sqlchat::error::ChatError;
use sqlchat::llm::MockLlmClient;
use sqlchat::session::{Role, GREETING};

use super::common::{seeded_database, sqlite_form};

#[tokio::test]
async fn test_student_scenario_end_to_end() {
    let (_dir, path) = seeded_database().await;
    let orchestrator = Orchestrator::new(&Config::default());
    let question = "How many students scored above 80?";
    let answer = "Two students scored above 80.";
    let llm = Arc::new(
        MockLlmClient::new()
            .with_tool_call(
                "sql_db_query",
                json!({"query": "SELECT COUNT(*) FROM STUDENT WHERE MARKS > 80"}),
            )
            .with_text(answer),
    );

    let mut session = orchestrator
        .start_with_client(&sqlite_form(&path), llm)
        .await
        .unwrap();

    assert_eq!(session.tables(), ["STUDENT".to_string()]);
    assert_eq!(session.schema_error(), None);
    let preview = &session.previews()[0];
    assert_eq!(preview.table, "STUDENT");
    assert_eq!(preview.result.as_ref().unwrap().rows.len(), 5);

    let mut events: Vec<AgentEvent> = Vec::new();
    let turn = session.ask(question, &mut events).await.unwrap().unwrap();
    assert_eq!(turn.content, answer);

    let turns = session.conversation().turns();
    let transcript: Vec<(Role, &str)> = turns.iter().map(|t| (t.role, t.content.as_str())).collect();
    assert_eq!(
        transcript,
        vec![
            (Role::Assistant, GREETING),
            (Role::User, question),
            (Role::Assistant, answer),
        ]
    );

    assert_eq!(session.audit().len(), 1);
    let entry = session.audit().recent(1)[0];
    assert_eq!(entry.query, question);
    assert_eq!(entry.response, answer);

    let tool_events: Vec<&AgentEvent> = events
        .iter()
        .filter(|e| !matches!(e, AgentEvent::Token(_)))
        .collect();
    assert_eq!(tool_events.len(), 2);
    assert!(matches!(
        tool_events[0],
        AgentEvent::ToolCall { tool, input } if tool == "sql_db_query" && input.contains("MARKS > 80")
    ));
    // Alice (92) and David (88).
    assert!(matches!(tool_events[1], AgentEvent::ToolResult { output, .. } if output == "(2)"));
}

#[tokio::test]
async fn test_missing_file_builds_no_agent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");
    let orchestrator = Orchestrator::new(&Config::default());
    let llm = Arc::new(MockLlmClient::new());

    let result = orchestrator
        .start_with_client(&sqlite_form(&path), Arc::clone(&llm) as _)
        .await;

    assert!(matches!(result, Err(ChatError::NotFound(_))));
    assert!(llm.requests().is_empty());
    assert!(orchestrator.cache().is_empty().await);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_rejected_key_stops_startup() {
    let (_dir, path) = seeded_database().await;
    let orchestrator = Orchestrator::new(&Config::default());
    let llm = Arc::new(MockLlmClient::new().rejecting_auth("Invalid API Key"));

    let result = orchestrator.start_with_client(&sqlite_form(&path), llm).await;
    assert!(matches!(result, Err(ChatError::Auth(_))));
}

#[tokio::test]
async fn test_failed_turn_is_not_audited() {
    let (_dir, path) = seeded_database().await;
    let orchestrator = Orchestrator::new(&Config::default());
    let llm = Arc::new(MockLlmClient::new().with_error(ChatError::llm("Rate limited")));

    let mut session = orchestrator
        .start_with_client(&sqlite_form(&path), llm)
        .await
        .unwrap();

    let mut events: Vec<AgentEvent> = Vec::new();
    let turn = session.ask("Who scored highest?", &mut events).await.unwrap().unwrap();

    assert!(turn.content.starts_with("Error processing query: "));
    assert!(turn.content.contains("Rate limited"));
    assert_eq!(session.conversation().len(), 3);
    assert!(session.audit().is_empty());
}

#[tokio::test]
async fn test_audit_log_keeps_newest_entries() {
    let (_dir, path) = seeded_database().await;
    let mut config = Config::default();
    config.session.max_audit_entries = 2;
    let orchestrator = Orchestrator::new(&config);
    let llm = Arc::new(
        MockLlmClient::new()
            .with_text("one")
            .with_text("two")
            .with_text("three"),
    );

    let mut session = orchestrator
        .start_with_client(&sqlite_form(&path), llm)
        .await
        .unwrap();

    for question in ["first", "second", "third"] {
        let mut events: Vec<AgentEvent> = Vec::new();
        session.ask(question, &mut events).await.unwrap();
    }

    let queries: Vec<&str> = session.audit().entries().map(|e| e.query.as_str()).collect();
    assert_eq!(queries, vec!["second", "third"]);
}

#[tokio::test]
async fn test_resets_are_independent() {
    let (_dir, path) = seeded_database().await;
    let orchestrator = Orchestrator::new(&Config::default());
    let llm = Arc::new(MockLlmClient::new().with_text("Alice has 92."));

    let mut session = orchestrator
        .start_with_client(&sqlite_form(&path), llm)
        .await
        .unwrap();
    let mut events: Vec<AgentEvent> = Vec::new();
    session.ask("Top student?", &mut events).await.unwrap();

    session.clear_chat();
    assert_eq!(session.conversation().len(), 1);
    assert_eq!(session.conversation().turns()[0].content, GREETING);
    assert_eq!(session.audit().len(), 1);

    session.clear_audit();
    assert!(session.audit().is_empty());
    assert_eq!(session.conversation().len(), 1);
}

#[tokio::test]
async fn test_sessions_share_the_cached_handle() {
    let (_dir, path) = seeded_database().await;
    let orchestrator = Orchestrator::new(&Config::default());
    let form = sqlite_form(&path);

    let mut first = orchestrator
        .start_with_client(&form, Arc::new(MockLlmClient::new().with_text("A")))
        .await
        .unwrap();
    let second = orchestrator
        .start_with_client(&form, Arc::new(MockLlmClient::new()))
        .await
        .unwrap();

    assert_eq!(orchestrator.cache().len().await, 1);

    let mut events: Vec<AgentEvent> = Vec::new();
    first.ask("q", &mut events).await.unwrap();
    assert_eq!(first.audit().len(), 1);
    assert!(second.audit().is_empty());
    assert_eq!(second.conversation().len(), 1);
}
