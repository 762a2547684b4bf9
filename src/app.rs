//! Session bootstrap for SQLChat.
//!
//! Runs the startup pipeline for a submitted form: validate the inputs,
//! connect and probe the database, preview its tables, then build the agent.
//! Any failure stops the pipeline before later steps run, except a failed table
//! listing, which is kept on the session and shown next to the chat.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::agent::{AgentFactory, SqlAgent};
use crate::config::{Config, ConnectionConfig};
use crate::connection::{ConnectionCache, DatabaseConnector};
use crate::db::DatabaseClient;
use crate::error::Result;
use crate::inspect::{SchemaInspector, TablePreview};
use crate::llm::LlmClient;
use crate::session::Session;
use crate::validate::{validate_inputs, FormInput};

/// A probed database with its table listing and previews.
struct PreparedDatabase {
    connection: ConnectionConfig,
    db: Arc<dyn DatabaseClient>,
    tables: Vec<String>,
    previews: Vec<TablePreview>,
    schema_error: Option<String>,
}

/// Coordinates the startup components and produces sessions.
pub struct Orchestrator {
    connector: DatabaseConnector,
    agents: AgentFactory,
    max_audit_entries: usize,
}

impl Orchestrator {
    /// Creates an orchestrator with its own connection cache.
    pub fn new(config: &Config) -> Self {
        let cache = Arc::new(ConnectionCache::new(Duration::from_secs(
            config.session.cache_ttl_secs,
        )));
        Self::with_connector(config, DatabaseConnector::new(cache))
    }

    /// Creates an orchestrator around an existing connector (and its cache).
    pub fn with_connector(config: &Config, connector: DatabaseConnector) -> Self {
        Self {
            connector,
            agents: AgentFactory::new(config.llm.clone()),
            max_audit_entries: config.session.max_audit_entries,
        }
    }

    pub fn cache(&self) -> &Arc<ConnectionCache> {
        self.connector.cache()
    }

    /// Starts a session for `form`, authenticating with its API key.
    pub async fn start(&self, form: &FormInput) -> Result<Session> {
        let prepared = self.prepare(form).await?;
        let agent = self.agents.build(&form.api_key, Arc::clone(&prepared.db)).await?;
        Ok(self.session(prepared, agent))
    }

    /// Starts a session using `client` instead of creating one from the API key.
    pub async fn start_with_client(
        &self,
        form: &FormInput,
        client: Arc<dyn LlmClient>,
    ) -> Result<Session> {
        let prepared = self.prepare(form).await?;
        let agent = self
            .agents
            .build_with_client(client, Arc::clone(&prepared.db))
            .await?;
        Ok(self.session(prepared, agent))
    }

    async fn prepare(&self, form: &FormInput) -> Result<PreparedDatabase> {
        let connection = validate_inputs(form)?;
        info!(connection = %connection.display_string(), "Starting session");

        let db = self.connector.connect(&connection).await?;

        let inspector = SchemaInspector::new(Arc::clone(&db));
        let (tables, schema_error) = match inspector.list_tables().await {
            Ok(tables) => (tables, None),
            Err(e) => {
                warn!(error = %e, "Failed to list tables");
                (Vec::new(), Some(e.message().to_string()))
            }
        };
        if tables.is_empty() && schema_error.is_none() {
            warn!("Database has no tables");
        }
        let previews = inspector.preview_all(&tables).await;

        Ok(PreparedDatabase {
            connection,
            db,
            tables,
            previews,
            schema_error,
        })
    }

    fn session(&self, prepared: PreparedDatabase, agent: Arc<dyn SqlAgent>) -> Session {
        info!(tables = prepared.tables.len(), "Session ready");
        let session = Session::new(
            prepared.connection,
            agent,
            prepared.tables,
            prepared.previews,
            self.max_audit_entries,
        );
        match prepared.schema_error {
            Some(message) => session.with_schema_error(message),
            None => session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ClientOpener;
    use crate::db::{DatabaseBackend, MockDatabaseClient, Schema, Table};
    use crate::error::ChatError;
    use crate::llm::MockLlmClient;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockOpener {
        opened: AtomicUsize,
        list_tables_error: Option<&'static str>,
    }

    #[async_trait]
    impl ClientOpener for MockOpener {
        async fn open(&self, _config: &ConnectionConfig) -> Result<Arc<dyn DatabaseClient>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let schema = Schema {
                tables: vec![Table::new("STUDENT")],
            };
            let client = MockDatabaseClient::with_schema(schema);
            Ok(Arc::new(match self.list_tables_error {
                Some(message) => client.with_list_tables_error(message),
                None => client,
            }))
        }
    }

    fn orchestrator() -> (Arc<MockOpener>, Orchestrator) {
        orchestrator_with(None)
    }

    fn orchestrator_with(list_tables_error: Option<&'static str>) -> (Arc<MockOpener>, Orchestrator) {
        let opener = Arc::new(MockOpener {
            opened: AtomicUsize::new(0),
            list_tables_error,
        });
        let connector = DatabaseConnector::with_opener(
            Arc::new(ConnectionCache::default()),
            opener.clone(),
        );
        (opener, Orchestrator::with_connector(&Config::default(), connector))
    }

    fn form(api_key: &str) -> FormInput {
        FormInput {
            api_key: api_key.to_string(),
            backend: DatabaseBackend::Sqlite,
            sqlite_path: PathBuf::from("student.db"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_yields_session_with_previews() {
        let (_, orchestrator) = orchestrator();
        let session = orchestrator
            .start_with_client(&form("gsk_test"), Arc::new(MockLlmClient::new()))
            .await
            .unwrap();

        assert_eq!(session.tables(), ["STUDENT".to_string()]);
        assert_eq!(session.previews().len(), 1);
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.audit().capacity(), 50);
        assert_eq!(session.schema_error(), None);
    }

    #[tokio::test]
    async fn test_table_listing_failure_still_starts_session() {
        let (opener, orchestrator) = orchestrator_with(Some("permission denied for sqlite_master"));
        let llm = Arc::new(MockLlmClient::new().with_text("Still here."));
        let mut session = orchestrator
            .start_with_client(&form("gsk_test"), llm)
            .await
            .unwrap();

        assert_eq!(session.schema_error(), Some("permission denied for sqlite_master"));
        assert!(session.tables().is_empty());
        assert!(session.previews().is_empty());
        assert_eq!(opener.opened.load(Ordering::SeqCst), 1);

        let mut events: Vec<crate::agent::AgentEvent> = Vec::new();
        let turn = session.ask("Anyone there?", &mut events).await.unwrap().unwrap();
        assert_eq!(turn.content, "Still here.");
        assert_eq!(session.audit().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_never_connects() {
        let (opener, orchestrator) = orchestrator();
        let err = orchestrator
            .start_with_client(&form(" "), Arc::new(MockLlmClient::new()))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(opener.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_key_fails_after_connecting() {
        let (opener, orchestrator) = orchestrator();
        let llm = Arc::new(MockLlmClient::new().rejecting_auth("Please enter a valid API key"));
        let err = orchestrator
            .start_with_client(&form("gsk_bad"), llm)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ChatError::Auth(_)));
        assert!(err.is_fatal_at_startup());
        assert_eq!(opener.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sessions_share_the_cached_handle() {
        let (opener, orchestrator) = orchestrator();
        for _ in 0..2 {
            orchestrator
                .start_with_client(&form("gsk_test"), Arc::new(MockLlmClient::new()))
                .await
                .unwrap();
        }
        assert_eq!(opener.opened.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.cache().len().await, 1);
    }
}
