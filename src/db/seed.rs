//! Demo database seeding.
//!
//! Creates the sample `STUDENT` database used by `sqlchat --init-demo`.

use crate::error::{ChatError, Result};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use std::path::Path;
use tracing::info;

/// (NAME, CLASS, SECTION, MARKS)
pub const STUDENTS: [(&str, &str, &str, i64); 5] = [
    ("Alice", "Cyber Security", "A", 92),
    ("Bob", "Machine Learning", "B", 78),
    ("Charlie", "Cloud Computing", "C", 65),
    ("David", "AI & Robotics", "B", 88),
    ("Eve", "Blockchain", "A", 73),
];

const CREATE_STUDENT: &str = r#"
CREATE TABLE STUDENT (
    NAME VARCHAR(25),
    CLASS VARCHAR(25),
    SECTION VARCHAR(25),
    MARKS INT
)
"#;

/// Creates a new SQLite file at `path` holding the sample `STUDENT` table.
///
/// Refuses to touch an existing file.
pub async fn create_student_database(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(ChatError::config(format!(
            "{} already exists; refusing to overwrite it",
            path.display()
        )));
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let mut conn = SqliteConnection::connect_with(&options)
        .await
        .map_err(|e| ChatError::connection(format!("Cannot create {}: {e}", path.display())))?;

    let mut tx = conn.begin().await.map_err(seed_error)?;
    sqlx::query(CREATE_STUDENT)
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?;

    for (name, class, section, marks) in STUDENTS {
        sqlx::query("INSERT INTO STUDENT (NAME, CLASS, SECTION, MARKS) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(class)
            .bind(section)
            .bind(marks)
            .execute(&mut *tx)
            .await
            .map_err(seed_error)?;
    }
    tx.commit().await.map_err(seed_error)?;
    conn.close().await.map_err(seed_error)?;

    info!(path = %path.display(), rows = STUDENTS.len(), "Created demo database");
    Ok(())
}

fn seed_error(e: sqlx::Error) -> ChatError {
    ChatError::internal(format!("Failed to seed demo database: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refuses_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = create_student_database(file.path()).await.unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[tokio::test]
    async fn test_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.db");
        create_student_database(&path).await.unwrap();
        assert!(path.exists());
    }
}
