use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use vecscope_core::Result;

use crate::explorer::Explorer;

/// Registry of open explorer sessions, keyed by an arbitrary session key
/// (typically the database name).
///
/// Opening a key that is already registered hands back the existing session
/// instead of creating a second one.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Explorer>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `key`, creating it with `factory` if needed.
    ///
    /// The factory runs outside the registry lock. If two callers race to open
    /// the same key, the first registered session wins and the other is dropped.
    pub async fn open<F, Fut>(&self, key: impl Into<String>, factory: F) -> Result<Arc<Explorer>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Explorer>>,
    {
        let key = key.into();
        if let Some(existing) = self.get(&key).await {
            tracing::debug!(%key, "reusing open session");
            return Ok(existing);
        }

        let explorer = Arc::new(factory().await?);
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(key.clone()).or_insert(explorer).clone();
        tracing::info!(%key, open = sessions.len(), "session opened");
        Ok(session)
    }

    /// Register `explorer` under `key`, returning the session it replaced.
    pub async fn insert(&self, key: impl Into<String>, explorer: Explorer) -> Option<Arc<Explorer>> {
        self.sessions
            .write()
            .await
            .insert(key.into(), Arc::new(explorer))
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Explorer>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Remove and return the session for `key`.
    pub async fn close(&self, key: &str) -> Option<Arc<Explorer>> {
        let removed = self.sessions.write().await.remove(key);
        if removed.is_some() {
            tracing::info!(key, "session closed");
        }
        removed
    }

    /// Keys of all open sessions, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use vecscope_core::VecscopeError;
    use vecscope_projection::PcaProjector;

    use super::*;
    use crate::memory::InMemoryRowSource;

    fn explorer() -> Explorer {
        Explorer::new(
            Arc::new(InMemoryRowSource::new()),
            Arc::new(PcaProjector::new()),
        )
    }

    #[tokio::test]
    async fn open_reuses_existing_session() {
        let manager = SessionManager::new();
        let built = AtomicUsize::new(0);

        let first = manager
            .open("analytics", || async {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(explorer())
            })
            .await
            .unwrap();
        let second = manager
            .open("analytics", || async {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(explorer())
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn failed_factory_registers_nothing() {
        let manager = SessionManager::new();
        let result = manager
            .open("broken", || async {
                Err(VecscopeError::Database("connection refused".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn close_and_list() {
        let manager = SessionManager::new();
        manager.insert("b", explorer()).await;
        manager.insert("a", explorer()).await;
        assert_eq!(manager.keys().await, vec!["a".to_string(), "b".to_string()]);

        assert!(manager.close("a").await.is_some());
        assert!(manager.close("a").await.is_none());
        assert!(manager.get("a").await.is_none());
        assert!(manager.get("b").await.is_some());
        assert_eq!(manager.len().await, 1);
    }
}
