//! Shared fixtures for the integration tests.

use std::path::{Path, PathBuf};

use sqlchat::db::{seed, DatabaseBackend};
use sqlchat::validate::FormInput;
use tempfile::TempDir;

/// Creates a fresh sample database; keep the `TempDir` alive while using it.
pub async fn seeded_database() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("student.db");
    seed::create_student_database(&path).await.unwrap();
    (dir, path)
}

pub fn sqlite_form(path: &Path) -> FormInput {
    FormInput {
        api_key: "gsk_test".to_string(),
        backend: DatabaseBackend::Sqlite,
        sqlite_path: path.to_path_buf(),
        ..Default::default()
    }
}
