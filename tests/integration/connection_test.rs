//! Connection tests: validation, read-only handles and caching.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sqlchat::config::ConnectionConfig;
use sqlchat::connection::{ConnectionCache, DatabaseConnector};
use sqlchat::db::DatabaseBackend;
use sqlchat::error::ChatError;
use sqlchat::validate::{validate_inputs, FormInput, RemoteFields};

use super::common::seeded_database;

fn connector(ttl: Duration) -> DatabaseConnector {
    DatabaseConnector::new(Arc::new(ConnectionCache::new(ttl)))
}

#[test]
fn test_validator_names_first_blank_field() {
    let mut form = FormInput {
        backend: DatabaseBackend::MySql,
        ..Default::default()
    };

    let mut messages = Vec::new();
    let fill: [fn(&mut FormInput); 5] = [
        |f| f.api_key = "gsk_test".to_string(),
        |f| f.remote.host = "db.local".to_string(),
        |f| f.remote.user = "reader".to_string(),
        |f| f.remote.password = "secret".to_string(),
        |f| f.remote.database = "school".to_string(),
    ];
    for step in fill {
        let Err(ChatError::Validation(message)) = validate_inputs(&form) else {
            panic!("expected a validation error");
        };
        messages.push(message);
        step(&mut form);
    }

    assert_eq!(
        messages,
        vec![
            "Please enter your API key",
            "Please provide MySQL host",
            "Please provide MySQL user",
            "Please provide MySQL password",
            "Please provide MySQL database",
        ]
    );

    let config = validate_inputs(&form).unwrap();
    assert_eq!(config.backend(), DatabaseBackend::MySql);
    assert!(!config.display_string().contains("secret"));
}

#[test]
fn test_whitespace_counts_as_blank() {
    let form = FormInput {
        api_key: "gsk_test".to_string(),
        backend: DatabaseBackend::MySql,
        remote: RemoteFields {
            host: "db.local".to_string(),
            user: "   ".to_string(),
            password: "secret".to_string(),
            database: "school".to_string(),
        },
        ..Default::default()
    };

    let err = validate_inputs(&form).unwrap_err();
    assert_eq!(err.to_string(), "Please provide MySQL user");
}

#[tokio::test]
async fn test_repeated_connects_reuse_the_handle() {
    let (_dir, path) = seeded_database().await;
    let connector = connector(Duration::from_secs(7200));
    let config = ConnectionConfig::embedded(&path);

    let first = connector.connect(&config).await.unwrap();
    let second = connector.connect(&config).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(connector.cache().len().await, 1);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.db");
    let connector = connector(Duration::from_secs(60));

    let result = connector.connect(&ConnectionConfig::embedded(&path)).await;

    assert!(matches!(result, Err(ChatError::NotFound(_))));
    assert!(connector.cache().is_empty().await);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_embedded_handle_is_read_only() {
    let (_dir, path) = seeded_database().await;
    let db = connector(Duration::from_secs(60))
        .connect(&ConnectionConfig::embedded(&path))
        .await
        .unwrap();

    let insert = db
        .execute_query("INSERT INTO STUDENT VALUES ('Mallory', 'Hacking', 'Z', 1)")
        .await;
    assert!(insert.is_err());

    let count = db.execute_query("SELECT COUNT(*) FROM STUDENT").await.unwrap();
    assert_eq!(count.to_tuple_text(), "(5)");
}

#[tokio::test]
async fn test_schema_listing_and_preview() {
    let (_dir, path) = seeded_database().await;
    let db = connector(Duration::from_secs(60))
        .connect(&ConnectionConfig::embedded(&path))
        .await
        .unwrap();
    let inspector = sqlchat::inspect::SchemaInspector::new(db);

    let tables = inspector.list_tables().await.unwrap();
    assert_eq!(tables, vec!["STUDENT".to_string()]);

    let preview = inspector.preview("STUDENT").await;
    let result = preview.result.unwrap();
    let columns: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["NAME", "CLASS", "SECTION", "MARKS"]);
    assert_eq!(result.rows.len(), 5);

    let missing = inspector.preview("GHOST").await;
    assert!(missing.result.is_err());
}
