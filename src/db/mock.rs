//! Mock database clients for testing.
//!
//! Provides in-memory implementations for exercising the agent, inspector and
//! connector without a real database.

use super::{ColumnInfo, DatabaseBackend, DatabaseClient, QueryResult, Schema, Value};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that returns predefined results.
///
/// Queries are matched on their whitespace-normalized, case-insensitive text.
/// Unmatched `SELECT` queries return a single `result` row echoing the SQL.
#[derive(Default)]
pub struct MockDatabaseClient {
    backend: DatabaseBackend,
    schema: Schema,
    responses: HashMap<String, std::result::Result<QueryResult, String>>,
    executed: Mutex<Vec<String>>,
    pings: AtomicUsize,
    list_tables_error: Option<String>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Default::default()
        }
    }

    /// Sets the reported backend.
    pub fn with_backend(mut self, backend: DatabaseBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Registers the result returned for `sql`.
    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.responses.insert(normalize(sql), Ok(result));
        self
    }

    /// Registers a query error returned for `sql`.
    pub fn with_error(mut self, sql: &str, message: impl Into<String>) -> Self {
        self.responses.insert(normalize(sql), Err(message.into()));
        self
    }

    /// Makes `list_tables` fail with a query error while `ping` still succeeds.
    pub fn with_list_tables_error(mut self, message: impl Into<String>) -> Self {
        self.list_tables_error = Some(message.into());
        self
    }

    /// Returns every query executed so far, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    /// Returns how many times the client was pinged.
    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(';')
        .to_lowercase()
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        match &self.list_tables_error {
            Some(message) => Err(ChatError::query(message.clone())),
            None => Ok(self.schema.table_names()),
        }
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        if let Some(response) = self.responses.get(&normalize(sql)) {
            return response.clone().map_err(ChatError::query);
        }

        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            let columns = vec![ColumnInfo::new("result", "TEXT")];
            let rows = vec![vec![Value::String(format!("Mock result for: {sql}"))]];
            Ok(QueryResult::with_data(columns, rows).with_execution_time(Duration::from_millis(1)))
        } else {
            Ok(QueryResult::new())
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A client whose every operation fails with a connection error.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySql
    }

    async fn ping(&self) -> Result<()> {
        Err(ChatError::connection(self.message.clone()))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Err(ChatError::connection(self.message.clone()))
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Err(ChatError::connection(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(ChatError::connection(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
