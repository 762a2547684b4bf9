//! Schema preview for the sidebar.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::Result;

/// Number of sample rows fetched per table.
pub const PREVIEW_ROWS: usize = 5;

/// Sample rows of one table, or the error that prevented fetching them.
#[derive(Debug)]
pub struct TablePreview {
    pub table: String,
    pub result: Result<QueryResult>,
}

/// Lists tables and fetches small per-table samples.
#[derive(Clone)]
pub struct SchemaInspector {
    db: Arc<dyn DatabaseClient>,
}

impl SchemaInspector {
    pub fn new(db: Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }

    /// Lists usable table names, sorted.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.db.list_tables().await?;
        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Fetches up to [`PREVIEW_ROWS`] rows of `table`.
    ///
    /// Never fails as a whole; errors are kept on the preview.
    pub async fn preview(&self, table: &str) -> TablePreview {
        let sql = format!(
            "SELECT * FROM {} LIMIT {PREVIEW_ROWS}",
            self.db.backend().quote_identifier(table)
        );
        let result = self.db.execute_query(&sql).await;
        if let Err(e) = &result {
            warn!(table, error = %e, "Table preview failed");
        }
        TablePreview {
            table: table.to_string(),
            result,
        }
    }

    /// Previews each of `tables` in order.
    pub async fn preview_all(&self, tables: &[String]) -> Vec<TablePreview> {
        let mut previews = Vec::with_capacity(tables.len());
        for table in tables {
            previews.push(self.preview(table).await);
        }
        previews
    }
}
