//! Time-bounded cache of probed database handles.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::db::DatabaseClient;
use crate::error::Result;

/// Default lifetime of a cached handle (two hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(7200);

struct CachedHandle {
    handle: Arc<dyn DatabaseClient>,
    created_at: Instant,
}

impl CachedHandle {
    fn is_live(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

/// Memoizes live database handles keyed by their full connection config.
///
/// One instance is shared by every session in the process. Initialization is
/// double-checked under a lock held per key, so concurrent first access for a
/// key runs the initializer exactly once while other keys proceed.
pub struct ConnectionCache {
    ttl: Duration,
    entries: RwLock<HashMap<ConnectionConfig, CachedHandle>>,
    init_locks: Mutex<HashMap<ConnectionConfig, Arc<Mutex<()>>>>,
}

impl ConnectionCache {
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            init_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached handle for `key` if it has not expired.
    pub async fn get(&self, key: &ConnectionConfig) -> Option<Arc<dyn DatabaseClient>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_live(self.ttl))
            .map(|entry| Arc::clone(&entry.handle))
    }

    /// Returns the cached handle for `key`, running `init` to create one if the
    /// entry is missing or expired.
    ///
    /// Failed initializations are not cached. Inserting a handle drops every
    /// expired entry.
    pub async fn get_or_try_init<F, Fut>(
        &self,
        key: &ConnectionConfig,
        init: F,
    ) -> Result<Arc<dyn DatabaseClient>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn DatabaseClient>>>,
    {
        if let Some(handle) = self.get(key).await {
            return Ok(handle);
        }

        let key_lock = self.key_lock(key).await;
        let result = {
            let _guard = key_lock.lock().await;
            match self.get(key).await {
                Some(handle) => {
                    debug!("Connection initialized by a concurrent caller");
                    Ok(handle)
                }
                None => self.init_and_insert(key, init).await,
            }
        };
        self.release_key_lock(key, key_lock).await;
        result
    }

    async fn init_and_insert<F, Fut>(
        &self,
        key: &ConnectionConfig,
        init: F,
    ) -> Result<Arc<dyn DatabaseClient>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn DatabaseClient>>>,
    {
        let handle = init().await?;

        let expired = {
            let mut entries = self.entries.write().await;
            let replaced = entries.insert(
                key.clone(),
                CachedHandle {
                    handle: Arc::clone(&handle),
                    created_at: Instant::now(),
                },
            );
            let stale: Vec<ConnectionConfig> = entries
                .iter()
                .filter(|(_, entry)| !entry.is_live(self.ttl))
                .map(|(stale_key, _)| stale_key.clone())
                .collect();
            let mut expired: Vec<(ConnectionConfig, CachedHandle)> = stale
                .into_iter()
                .filter_map(|stale_key| entries.remove(&stale_key).map(|entry| (stale_key, entry)))
                .collect();
            expired.extend(replaced.map(|entry| (key.clone(), entry)));
            expired
        };
        debug!(target = %key.display_string(), "Cached database handle");

        for (stale_key, entry) in expired {
            retire(&stale_key, entry.handle).await;
        }
        Ok(handle)
    }

    async fn key_lock(&self, key: &ConnectionConfig) -> Arc<Mutex<()>> {
        let mut locks = self.init_locks.lock().await;
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Forgets the lock for `key` once no other caller is waiting on it.
    async fn release_key_lock(&self, key: &ConnectionConfig, key_lock: Arc<Mutex<()>>) {
        let mut locks = self.init_locks.lock().await;
        // One reference in the map and one here.
        if Arc::strong_count(&key_lock) <= 2 {
            locks.remove(key);
        }
    }

    /// Returns the number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Closes an evicted handle unless a session still holds it.
///
/// A handle still in use is released when its last holder drops it.
async fn retire(key: &ConnectionConfig, handle: Arc<dyn DatabaseClient>) {
    if Arc::strong_count(&handle) > 1 {
        debug!(target = %key.display_string(), "Evicted expired handle still in use");
        return;
    }
    match handle.close().await {
        Ok(()) => debug!(target = %key.display_string(), "Closed expired database handle"),
        Err(e) => warn!(target = %key.display_string(), error = %e, "Failed to close expired handle"),
    }
}

impl Default for ConnectionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
