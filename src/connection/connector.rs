//! Database connector: open, probe, and memoize handles.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::ConnectionCache;
use crate::config::ConnectionConfig;
use crate::db::{self, DatabaseClient};
use crate::error::Result;

/// Opens an unprobed database client for a configuration.
#[async_trait]
pub trait ClientOpener: Send + Sync {
    async fn open(&self, config: &ConnectionConfig) -> Result<Arc<dyn DatabaseClient>>;
}

/// Opens real SQLite or MySQL clients through sqlx.
pub struct DriverOpener;

#[async_trait]
impl ClientOpener for DriverOpener {
    async fn open(&self, config: &ConnectionConfig) -> Result<Arc<dyn DatabaseClient>> {
        db::connect(config).await
    }
}

/// Hands out live, probed database handles.
///
/// A handle is only returned after `SELECT 1` succeeded on it. Handles are
/// reused for the cache TTL without re-probing.
#[derive(Clone)]
pub struct DatabaseConnector {
    cache: Arc<ConnectionCache>,
    opener: Arc<dyn ClientOpener>,
}

impl DatabaseConnector {
    /// Creates a connector backed by the real drivers.
    pub fn new(cache: Arc<ConnectionCache>) -> Self {
        Self::with_opener(cache, Arc::new(DriverOpener))
    }

    /// Creates a connector with a custom opener.
    pub fn with_opener(cache: Arc<ConnectionCache>, opener: Arc<dyn ClientOpener>) -> Self {
        Self { cache, opener }
    }

    /// Returns the shared cache.
    pub fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }

    /// Returns a live handle for `config`.
    ///
    /// Fails with `NotFound` for a missing embedded file and with `Connection`
    /// if the server cannot be reached or the probe fails.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn DatabaseClient>> {
        self.cache
            .get_or_try_init(config, || async {
                info!(target = %config.display_string(), "Opening database connection");
                let client = self.opener.open(config).await?;

                if let Err(e) = client.ping().await {
                    warn!(target = %config.display_string(), error = %e, "Connection probe failed");
                    let _ = client.close().await;
                    return Err(e);
                }
                Ok(client)
            })
            .await
    }
}
