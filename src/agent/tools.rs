//! Database tools exposed to the SQL agent.
//!
//! Every tool returns text for the model. Failures are returned as `Err`
//! messages so the agent can feed them back instead of aborting.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::prompt;
use crate::db::DatabaseClient;
use crate::llm::{LlmClient, Message, ToolCall, ToolDefinition};

pub const LIST_TABLES: &str = "sql_db_list_tables";
pub const SCHEMA: &str = "sql_db_schema";
pub const QUERY: &str = "sql_db_query";
pub const QUERY_CHECKER: &str = "sql_db_query_checker";

/// Names of all tools, in the order they are offered.
pub const TOOL_NAMES: [&str; 4] = [QUERY, SCHEMA, LIST_TABLES, QUERY_CHECKER];

/// Sample rows appended to each table in the schema tool output.
const SAMPLE_ROWS: usize = 3;

#[derive(Debug, Deserialize)]
struct SchemaArgs {
    table_names: String,
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
}

/// Returns the tool definitions offered to the model.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: QUERY.to_string(),
            description: "Execute a SQL query against the database and get back the result. \
                          If the query is not correct, an error message is returned; rewrite \
                          the query, check it, and try again."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "A detailed and correct SQL query." }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: SCHEMA.to_string(),
            description: format!(
                "Get the schema and sample rows for the specified tables. Call {LIST_TABLES} \
                 first to be sure the tables exist."
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "table_names": {
                        "type": "string",
                        "description": "A comma-separated list of table names, e.g. \"table1, table2\"."
                    }
                },
                "required": ["table_names"]
            }),
        },
        ToolDefinition {
            name: LIST_TABLES.to_string(),
            description: "List the tables in the database as a comma-separated string.".to_string(),
            parameters: serde_json::json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: QUERY_CHECKER.to_string(),
            description: format!(
                "Double check a query for mistakes before running it. Always use this tool \
                 before calling {QUERY}."
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The SQL query to check." }
                },
                "required": ["query"]
            }),
        },
    ]
}

/// Executes tool calls against one database.
#[derive(Clone)]
pub struct SqlToolbox {
    db: Arc<dyn DatabaseClient>,
    llm: Arc<dyn LlmClient>,
}

impl SqlToolbox {
    pub fn new(db: Arc<dyn DatabaseClient>, llm: Arc<dyn LlmClient>) -> Self {
        Self { db, llm }
    }

    /// Returns the SQL dialect of the underlying database.
    pub fn dialect(&self) -> &'static str {
        self.db.backend().dialect()
    }

    /// Runs one tool call, returning its output or an error message for the model.
    pub async fn run(&self, call: &ToolCall) -> std::result::Result<String, String> {
        debug!(tool = %call.name, "Executing tool");

        match call.name.as_str() {
            LIST_TABLES => self.list_tables().await,
            SCHEMA => {
                let args: SchemaArgs = parse_args(call, r#"{"table_names": string}"#)?;
                self.schema(&args.table_names).await
            }
            QUERY => {
                let args: QueryArgs = parse_args(call, r#"{"query": string}"#)?;
                self.query(&args.query).await
            }
            QUERY_CHECKER => {
                let args: QueryArgs = parse_args(call, r#"{"query": string}"#)?;
                self.check_query(&args.query).await
            }
            other => Err(format!(
                "{other} is not a valid tool, try one of [{}].",
                TOOL_NAMES.join(", ")
            )),
        }
    }

    async fn list_tables(&self) -> std::result::Result<String, String> {
        let tables = self.db.list_tables().await.map_err(|e| e.to_string())?;
        Ok(tables.join(", "))
    }

    async fn schema(&self, table_names: &str) -> std::result::Result<String, String> {
        let requested: Vec<&str> = table_names
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if requested.is_empty() {
            return Err("table_names must name at least one table".to_string());
        }

        let schema = self.db.introspect_schema().await.map_err(|e| e.to_string())?;

        let missing: Vec<&str> = requested
            .iter()
            .copied()
            .filter(|name| schema.table(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "table_names {{{}}} not found in database",
                missing.join(", ")
            ));
        }

        let mut sections = Vec::with_capacity(requested.len());
        for name in requested {
            let Some(table) = schema.table(name) else {
                continue;
            };
            let mut section = table.to_ddl();
            section.push_str(&self.sample_rows(&table.name).await);
            sections.push(section);
        }
        Ok(sections.join("\n\n"))
    }

    /// Renders a few rows as a tab-separated comment block.
    async fn sample_rows(&self, table: &str) -> String {
        let sql = format!(
            "SELECT * FROM {} LIMIT {SAMPLE_ROWS}",
            self.db.backend().quote_identifier(table)
        );
        match self.db.execute_query(&sql).await {
            Ok(result) => {
                let header = result
                    .columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join("\t");
                let rows = result
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|v| v.to_display_string())
                            .collect::<Vec<_>>()
                            .join("\t")
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("\n\n/*\n{SAMPLE_ROWS} rows from {table} table:\n{header}\n{rows}\n*/")
            }
            Err(e) => format!("\n\n/* sample rows unavailable: {} */", e.message()),
        }
    }

    async fn query(&self, sql: &str) -> std::result::Result<String, String> {
        if sql.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        let result = self
            .db
            .execute_query(sql)
            .await
            .map_err(|e| e.message().to_string())?;
        Ok(result.to_tuple_text())
    }

    async fn check_query(&self, sql: &str) -> std::result::Result<String, String> {
        if sql.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        let messages = vec![Message::user(prompt::query_checker_prompt(self.dialect(), sql))];
        let checked = self.llm.complete(&messages).await.map_err(|e| e.to_string())?;
        Ok(strip_code_fence(&checked))
    }
}

/// Parses tool arguments, describing the expected shape on failure.
fn parse_args<T: serde::de::DeserializeOwned>(
    call: &ToolCall,
    expected: &str,
) -> std::result::Result<T, String> {
    let raw = if call.arguments.trim().is_empty() {
        "{}"
    } else {
        call.arguments.as_str()
    };
    serde_json::from_str(raw).map_err(|e| {
        format!(
            "Could not parse arguments for {}: {e}. Expected {expected}.",
            call.name
        )
    })
}

/// Removes a surrounding Markdown code fence from model output.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = match inner.split_once('\n') {
        Some((lang, rest)) if !lang.contains(' ') => rest,
        _ => inner,
    };
    inner.trim().to_string()
}
