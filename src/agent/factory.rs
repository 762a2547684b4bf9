//! Agent construction.
//!
//! Builds a SQL agent bound to one database, verifying the API key first so a
//! bad key is reported before the user asks anything.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{SqlAgent, ToolCallingAgent};
use crate::config::LlmConfig;
use crate::db::DatabaseClient;
use crate::error::Result;
use crate::llm::{self, LlmClient};

/// Creates SQL agents from the `[llm]` settings.
#[derive(Debug, Clone, Default)]
pub struct AgentFactory {
    config: LlmConfig,
}

impl AgentFactory {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Builds an agent for `db`, authenticating with `api_key`.
    ///
    /// Fails with `Validation` for a blank key and `Auth` if the endpoint rejects it.
    pub async fn build(
        &self,
        api_key: &str,
        db: Arc<dyn DatabaseClient>,
    ) -> Result<Arc<dyn SqlAgent>> {
        let client = llm::create_client(api_key, &self.config)?;
        self.build_with_client(client, db).await
    }

    /// Builds an agent around an existing model client.
    pub async fn build_with_client(
        &self,
        client: Arc<dyn LlmClient>,
        db: Arc<dyn DatabaseClient>,
    ) -> Result<Arc<dyn SqlAgent>> {
        let timeout = Duration::from_secs(self.config.auth_timeout_secs);
        if let Err(e) = client.check_auth(timeout).await {
            warn!(error = %e, "API key check failed");
            return Err(e);
        }

        info!(
            model = %self.config.model,
            backend = %db.backend(),
            streaming = self.config.streaming,
            "Created SQL agent"
        );

        let agent = ToolCallingAgent::new(client, db)
            .with_streaming(self.config.streaming)
            .with_max_iterations(self.config.max_iterations);
        Ok(Arc::new(agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentEvent;
    use crate::db::MockDatabaseClient;
    use crate::error::ChatError;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_build_with_accepted_key() {
        let factory = AgentFactory::new(LlmConfig {
            streaming: false,
            ..Default::default()
        });
        let llm = Arc::new(MockLlmClient::new().with_text("Five students."));
        let agent = factory
            .build_with_client(llm, Arc::new(MockDatabaseClient::new()))
            .await
            .unwrap();

        let mut events: Vec<AgentEvent> = Vec::new();
        let answer = agent.answer("How many students?", &mut events).await.unwrap();
        assert_eq!(answer, "Five students.");
    }

    #[tokio::test]
    async fn test_rejected_key_builds_nothing() {
        let factory = AgentFactory::default();
        let llm = Arc::new(MockLlmClient::new().rejecting_auth("Please enter a valid API key"));
        let err = factory
            .build_with_client(llm, Arc::new(MockDatabaseClient::new()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::Auth(_)));
        assert_eq!(err.message(), "Please enter a valid API key");
    }

    #[tokio::test]
    async fn test_blank_key_is_a_validation_error() {
        let err = AgentFactory::default()
            .build("", Arc::new(MockDatabaseClient::new()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::Validation(_)));
    }
}
