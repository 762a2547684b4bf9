//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient` trait
//! for the embedded, read-only database file using sqlx.

use crate::db::{
    Column, ColumnInfo, DatabaseBackend, DatabaseClient, QueryResult, Row, Schema, Table, Value,
    MAX_ROWS, QUERY_TIMEOUT_SECS,
};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteClient {
    /// Opens the database file read-only.
    ///
    /// Fails with `NotFound` if the file does not exist; SQLite would otherwise
    /// happily create an empty database.
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ChatError::not_found(path.display().to_string()));
        }
        let path = path
            .canonicalize()
            .map_err(|e| ChatError::connection(format!("Cannot resolve {}: {e}", path.display())))?;

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| ChatError::connection(format!("Cannot open {}: {e}", path.display())))?;

        debug!(path = %path.display(), "Opened SQLite database read-only");
        Ok(Self { pool, path })
    }

    /// Returns the resolved path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetches column metadata for a query that returned no rows.
    async fn fetch_column_metadata(&self, sql: &str) -> Vec<ColumnInfo> {
        match (&self.pool).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Fetches columns and primary key for a specific table.
    async fn fetch_table(&self, table_name: &str) -> Result<Table> {
        let rows: Vec<(String, String, i64, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?)
            ORDER BY cid
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::query(format!("Failed to fetch columns for {table_name}: {e}")))?;

        let mut primary_key: Vec<(i64, String)> = rows
            .iter()
            .filter(|(_, _, _, _, pk)| *pk > 0)
            .map(|(name, _, _, _, pk)| (*pk, name.clone()))
            .collect();
        primary_key.sort();

        Ok(Table {
            name: table_name.to_string(),
            columns: rows
                .into_iter()
                .map(|(name, data_type, not_null, default, _)| Column {
                    name,
                    data_type,
                    is_nullable: not_null == 0,
                    default,
                })
                .collect(),
            primary_key: primary_key.into_iter().map(|(_, name)| name).collect(),
        })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ChatError::connection(e.to_string()))?;
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::query(format!("Failed to fetch tables: {e}")))
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let names = self.list_tables().await?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            tables.push(self.fetch_table(&name).await?);
        }
        Ok(Schema { tables })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| ChatError::query(format!("Query timed out after {QUERY_TIMEOUT_SECS} seconds")))?
        .map_err(|e| ChatError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.fetch_column_metadata(sql).await,
        };

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;
        if was_truncated {
            warn!(total_rows, max_rows = MAX_ROWS, "Truncating query result");
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single column value, trying the storage classes in turn.
///
/// SQLite is dynamically typed, so the declared column type is only a hint.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }

    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::Int(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Value::Float(v);
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::String(v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        return Value::Bytes(v);
    }
    Value::Null
}

/// Formats a query error, keeping only the database message when available.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::seed;

    async fn student_client() -> (tempfile::TempDir, SqliteClient) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("student.db");
        seed::create_student_database(&path).await.unwrap();
        let client = SqliteClient::open(&path).await.unwrap();
        (dir, client)
    }

    #[tokio::test]
    async fn test_open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let err = SqliteClient::open(&path).await.unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
        assert!(!path.exists(), "opening must not create the file");
    }

    #[tokio::test]
    async fn test_ping_and_list_tables() {
        let (_dir, client) = student_client().await;
        client.ping().await.unwrap();
        assert_eq!(client.list_tables().await.unwrap(), vec!["STUDENT"]);
    }

    #[tokio::test]
    async fn test_introspect_schema() {
        let (_dir, client) = student_client().await;
        let schema = client.introspect_schema().await.unwrap();

        let student = schema.table("STUDENT").unwrap();
        let names: Vec<_> = student.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["NAME", "CLASS", "SECTION", "MARKS"]);
        assert_eq!(student.columns[3].data_type, "INT");
    }

    #[tokio::test]
    async fn test_execute_select() {
        let (_dir, client) = student_client().await;
        let result = client
            .execute_query("SELECT NAME, MARKS FROM STUDENT WHERE MARKS > 80 ORDER BY NAME")
            .await
            .unwrap();

        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.columns[0].name, "NAME");
        assert_eq!(
            result.rows,
            vec![
                vec![Value::from("Alice"), Value::Int(92)],
                vec![Value::from("David"), Value::Int(88)],
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let (_dir, client) = student_client().await;
        let result = client
            .execute_query("SELECT NAME FROM STUDENT WHERE 1 = 0")
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_is_read_only() {
        let (_dir, client) = student_client().await;
        let result = client
            .execute_query("INSERT INTO STUDENT VALUES ('Mallory', 'X', 'Z', 1)")
            .await;
        assert!(matches!(result, Err(ChatError::Query(_))));
    }

    #[tokio::test]
    async fn test_query_error_message() {
        let (_dir, client) = student_client().await;
        let err = client
            .execute_query("SELECT * FROM nonexistent_table_xyz")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nonexistent_table_xyz"));
    }
}
