//! Database abstraction layer for SQLChat.
//!
//! Provides a trait-based interface for database operations, allowing
//! the embedded and remote backends to be used interchangeably.

mod mock;
mod mysql;
mod schema;
pub mod seed;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use schema::{Column, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Query timeout in seconds.
pub(crate) const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows to return from a query.
pub(crate) const MAX_ROWS: usize = 1000;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// Local SQLite file.
    #[default]
    Sqlite,
    /// Remote MySQL server.
    MySql,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "embedded" => Some(Self::Sqlite),
            "mysql" | "remote" => Some(Self::MySql),
            _ => None,
        }
    }

    /// Returns the SQL dialect name used in agent prompts.
    pub fn dialect(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::MySql => "MySQL",
        }
    }

    /// Returns the label shown in the configuration form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite (Local)",
            Self::MySql => "MySQL (Remote)",
        }
    }

    /// Returns the other backend (for toggling in the form).
    pub fn toggle(self) -> Self {
        match self {
            Self::Sqlite => Self::MySql,
            Self::MySql => Self::Sqlite,
        }
    }

    /// Quotes a table or column name for this backend.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Self::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
            Self::MySql => format!("`{}`", name.replace('`', "``")),
        }
    }
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opens a database client for the given configuration.
///
/// This does not probe the connection; [`crate::connection::DatabaseConnector`]
/// does that before handing the client out.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn DatabaseClient>> {
    match config {
        ConnectionConfig::Embedded { path } => {
            let client = SqliteClient::open(path).await?;
            Ok(Arc::new(client))
        }
        ConnectionConfig::Remote(remote) => {
            let client = MySqlClient::connect(remote).await?;
            Ok(Arc::new(client))
        }
    }
}

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with ChatError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Returns the backend this client talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Issues a trivial round-trip query (`SELECT 1`).
    async fn ping(&self) -> Result<()>;

    /// Lists usable table names, excluding system tables, sorted by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Introspects the columns of every usable table.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(DatabaseBackend::parse("SQLite"), Some(DatabaseBackend::Sqlite));
        assert_eq!(DatabaseBackend::parse("remote"), Some(DatabaseBackend::MySql));
        assert_eq!(DatabaseBackend::parse("postgres"), None);
    }

    #[test]
    fn test_backend_serde_names() {
        let json = serde_json::to_string(&DatabaseBackend::MySql).unwrap();
        assert_eq!(json, "\"mysql\"");
        let parsed: DatabaseBackend = serde_json::from_str("\"sqlite\"").unwrap();
        assert_eq!(parsed, DatabaseBackend::Sqlite);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(DatabaseBackend::Sqlite.quote_identifier("STUDENT"), "\"STUDENT\"");
        assert_eq!(DatabaseBackend::Sqlite.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(DatabaseBackend::MySql.quote_identifier("order"), "`order`");
    }

    #[test]
    fn test_toggle() {
        assert_eq!(DatabaseBackend::Sqlite.toggle(), DatabaseBackend::MySql);
        assert_eq!(DatabaseBackend::MySql.toggle(), DatabaseBackend::Sqlite);
    }
}
