use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::ComicSession;

/// Upper bound on how often abandoned sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    session: Arc<Mutex<ComicSession>>,
    /// Milliseconds since the registry epoch at the last lookup.
    last_seen_ms: AtomicU64,
}

/// All live authoring sessions.
///
/// Each session sits behind its own mutex, held for a whole interaction
/// (assemble → generate → store), so one user's requests are serialized
/// while different users proceed independently.
///
/// Sessions untouched for longer than the idle timeout are dropped by
/// `sweep_idle`, along with their pages and generation history.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    epoch: Instant,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            epoch: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub async fn create(&self, api_key: Option<String>) -> Uuid {
        let session = ComicSession::new(api_key);
        let id = session.id;
        let entry = Entry {
            session: Arc::new(Mutex::new(session)),
            last_seen_ms: AtomicU64::new(self.now_ms()),
        };
        self.sessions.write().await.insert(id, entry);
        info!("Session {id} created");
        id
    }

    /// Looks a session up and marks it as recently used.
    pub async fn get(&self, id: Uuid) -> Result<Arc<Mutex<ComicSession>>, AppError> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        entry.last_seen_ms.store(self.now_ms(), Ordering::Relaxed);
        Ok(entry.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!("Session {id} torn down"))
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    /// Drops every session idle for longer than `max_idle`. A session whose
    /// lock is held (a generation in flight) is never dropped.
    /// Returns how many sessions were removed.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = self.now_ms();
        let max_idle_ms = max_idle.as_millis() as u64;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle_ms = now.saturating_sub(entry.last_seen_ms.load(Ordering::Relaxed));
            let keep = idle_ms <= max_idle_ms || entry.session.try_lock().is_err();
            if !keep {
                info!("Session {id} expired after {}s idle", idle_ms / 1000);
            }
            keep
        });
        let removed = before - sessions.len();
        debug!("Idle sweep removed {removed} of {before} sessions");
        removed
    }

    /// Runs `sweep_idle` periodically for the life of the process.
    pub async fn expire_idle(self, max_idle: Duration) {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL.min(max_idle));
        loop {
            interval.tick().await;
            self.sweep_idle(max_idle).await;
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai_client::fake::solid_image;
    use crate::genai_client::SessionHandle;

    #[tokio::test]
    async fn test_create_then_get() {
        let registry = SessionRegistry::new();
        let id = registry.create(None).await;
        let session = registry.get(id).await.unwrap();
        assert_eq!(session.lock().await.id, id);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.get(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let a = registry.create(None).await;
        let b = registry.create(None).await;

        registry
            .get(a)
            .await
            .unwrap()
            .lock()
            .await
            .store
            .new_page(vec![solid_image(1)], SessionHandle::start());

        assert_eq!(registry.get(a).await.unwrap().lock().await.store.len(), 1);
        let other = registry.get(b).await.unwrap();
        let other = other.lock().await;
        assert!(other.store.is_empty());
        assert!(other.store.current_handle().is_none());
    }

    #[tokio::test]
    async fn test_remove_tears_down_session() {
        let registry = SessionRegistry::new();
        let id = registry.create(Some("key".to_string())).await;
        registry.remove(id).await.unwrap();
        assert_eq!(registry.len().await, 0);
        assert!(registry.remove(id).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire_and_used_ones_survive() {
        let registry = SessionRegistry::new();
        let idle = registry.create(None).await;
        let active = registry.create(None).await;

        tokio::time::advance(Duration::from_secs(40)).await;
        registry.get(active).await.unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;

        assert_eq!(registry.sweep_idle(Duration::from_secs(60)).await, 1);
        assert!(matches!(registry.get(idle).await, Err(AppError::NotFound(_))));
        assert!(registry.get(active).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_session_is_not_expired() {
        let registry = SessionRegistry::new();
        let id = registry.create(None).await;
        let session = registry.get(id).await.unwrap();
        let _guard = session.lock().await;

        tokio::time::advance(Duration::from_secs(600)).await;

        assert_eq!(registry.sweep_idle(Duration::from_secs(60)).await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_blank_api_key_is_ignored() {
        let registry = SessionRegistry::new();
        let id = registry.create(Some("   ".to_string())).await;
        assert!(registry.get(id).await.unwrap().lock().await.api_key.is_none());
    }
}
