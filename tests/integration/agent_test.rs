//! Agent tests: the SQL tools against a real SQLite file.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use sqlchat::agent::tools::SqlToolbox;
use sqlchat::agent::{AgentEvent, SqlAgent, ToolCallingAgent};
use sqlchat::config::ConnectionConfig;
use sqlchat::connection::{ConnectionCache, DatabaseConnector};
use sqlchat::db::DatabaseClient;
use sqlchat::llm::{MockLlmClient, ToolCall};

use super::common::seeded_database;

async fn open(path: &std::path::Path) -> Arc<dyn DatabaseClient> {
    DatabaseConnector::new(Arc::new(ConnectionCache::new(Duration::from_secs(60))))
        .connect(&ConnectionConfig::embedded(path))
        .await
        .unwrap()
}

fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall::new("call_1", name, arguments.to_string())
}

#[tokio::test]
async fn test_list_tables_and_schema_tools() {
    let (_dir, path) = seeded_database().await;
    let toolbox = SqlToolbox::new(open(&path).await, Arc::new(MockLlmClient::new()));

    let tables = toolbox.run(&call("sql_db_list_tables", json!({}))).await.unwrap();
    assert_eq!(tables, "STUDENT");

    let schema = toolbox
        .run(&call("sql_db_schema", json!({"table_names": "STUDENT"})))
        .await
        .unwrap();
    assert!(schema.contains("CREATE TABLE"));
    assert!(schema.contains("3 rows from STUDENT table:"));
    assert!(schema.contains("NAME\tCLASS\tSECTION\tMARKS"));

    let missing = toolbox
        .run(&call("sql_db_schema", json!({"table_names": "STUDENT, GHOST"})))
        .await
        .unwrap_err();
    assert_eq!(missing, "table_names {GHOST} not found in database");
}

#[tokio::test]
async fn test_query_tool_reports_sql_errors() {
    let (_dir, path) = seeded_database().await;
    let toolbox = SqlToolbox::new(open(&path).await, Arc::new(MockLlmClient::new()));

    let rows = toolbox
        .run(&call(
            "sql_db_query",
            json!({"query": "SELECT NAME FROM STUDENT WHERE MARKS > 85 ORDER BY NAME"}),
        ))
        .await
        .unwrap();
    assert_eq!(rows, "('Alice')\n('David')");

    let error = toolbox
        .run(&call("sql_db_query", json!({"query": "SELECT * FROM GHOST"})))
        .await
        .unwrap_err();
    assert!(error.contains("no such table"));
}

#[tokio::test]
async fn test_agent_recovers_from_a_bad_query() {
    let (_dir, path) = seeded_database().await;
    let llm = Arc::new(
        MockLlmClient::new()
            .with_tool_call("sql_db_query", json!({"query": "SELECT * FROM STUDENTS"}))
            .with_tool_call("sql_db_query", json!({"query": "SELECT MAX(MARKS) FROM STUDENT"}))
            .with_text("The highest mark is 92."),
    );
    let agent = ToolCallingAgent::new(llm, open(&path).await).with_streaming(false);

    let mut events: Vec<AgentEvent> = Vec::new();
    let answer = agent.answer("What is the highest mark?", &mut events).await.unwrap();
    assert_eq!(answer, "The highest mark is 92.");

    let outputs: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolResult { output, .. } => Some(output.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(outputs.len(), 2);
    assert!(outputs[0].starts_with("Error: "));
    assert_eq!(outputs[1], "(92)");
}
