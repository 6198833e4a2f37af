use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use docqa_rag::DocumentSession;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::protocol::{SessionId, SessionResponse};

/// Default ceiling on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 256;
/// Default seconds a session may sit unused before it is discarded.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60;

/// Bounds on how many sessions are kept and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Live sessions allowed at once; inserting past this evicts the least recently used.
    pub max_sessions: usize,
    /// Sessions unused for longer than this are pruned.
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

#[derive(Debug)]
pub struct SessionEntry {
    pub session: DocumentSession,
    pub created_at: DateTime<Utc>,
    last_used: Mutex<DateTime<Utc>>,
}

impl SessionEntry {
    fn new(session: DocumentSession, now: DateTime<Utc>) -> Self {
        Self { session, created_at: now, last_used: Mutex::new(now) }
    }

    pub fn last_used(&self) -> DateTime<Utc> {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self, now: DateTime<Utc>) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn describe(&self, session_id: &str) -> SessionResponse {
        SessionResponse {
            session_id: session_id.to_string(),
            name: self.session.document().name.clone(),
            chars: self.session.document().char_len(),
            created_at: self.created_at,
            last_used_at: self.last_used(),
            index: self.session.index_status().into(),
        }
    }
}

/// Live document sessions keyed by id.
///
/// Sessions end on explicit removal, when idle past `idle_ttl`, or when a new
/// upload needs the slot of the least recently used session.
#[derive(Debug, Default, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionEntry>>>>,
    limits: SessionLimits,
}

impl SessionManager {
    pub fn new(limits: SessionLimits) -> Self {
        Self { sessions: Arc::default(), limits }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub async fn insert(&self, session: DocumentSession) -> SessionId {
        let now = Utc::now();
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;

        prune_expired(&mut sessions, now - self.limits.idle_ttl);
        while sessions.len() >= self.limits.max_sessions.max(1) {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used())
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            info!(
                session_id = %oldest,
                max_sessions = self.limits.max_sessions,
                "evicted least recently used session"
            );
        }

        sessions.insert(session_id.clone(), Arc::new(SessionEntry::new(session, now)));
        session_id
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.read().await.get(session_id).cloned()?;
        entry.touch(Utc::now());
        Some(entry)
    }

    pub async fn remove(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.write().await.remove(session_id)
    }

    /// Drop every session idle past the TTL, returning how many were dropped.
    pub async fn prune_idle(&self) -> usize {
        self.prune_idle_at(Utc::now()).await
    }

    async fn prune_idle_at(&self, now: DateTime<Utc>) -> usize {
        prune_expired(&mut *self.sessions.write().await, now - self.limits.idle_ttl)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn prune_expired(
    sessions: &mut HashMap<SessionId, Arc<SessionEntry>>,
    cutoff: DateTime<Utc>,
) -> usize {
    let before = sessions.len();
    sessions.retain(|session_id, entry| {
        let keep = entry.last_used() >= cutoff;
        if !keep {
            info!(session_id = %session_id, "pruned idle session");
        }
        keep
    });
    before - sessions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_rag::testing::{BagOfWordsEmbedder, GroundedInference};
    use docqa_rag::{Document, QaPipeline};

    fn session() -> DocumentSession {
        let pipeline = Arc::new(
            QaPipeline::builder()
                .embedding_provider(Arc::new(BagOfWordsEmbedder::new(8)))
                .answer_inference(Arc::new(GroundedInference::new()))
                .build()
                .unwrap(),
        );
        pipeline.open(Document::new("text").with_name("notes.txt")).unwrap()
    }

    #[tokio::test]
    async fn sessions_live_until_removed() {
        let sessions = SessionManager::default();
        let id = sessions.insert(session()).await;
        assert!(sessions.get(&id).await.is_some());
        assert_eq!(sessions.len().await, 1);

        let entry = sessions.get(&id).await.unwrap();
        let described = entry.describe(&id);
        assert_eq!(described.name.as_deref(), Some("notes.txt"));
        assert_eq!(described.chars, 4);

        assert!(sessions.remove(&id).await.is_some());
        assert!(sessions.remove(&id).await.is_none());
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let sessions = SessionManager::default();
        let a = sessions.insert(session()).await;
        let b = sessions.insert(session()).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn full_manager_evicts_least_recently_used() {
        let limits = SessionLimits { max_sessions: 2, ..SessionLimits::default() };
        let sessions = SessionManager::new(limits);
        let first = sessions.insert(session()).await;
        let second = sessions.insert(session()).await;

        let later = Utc::now() + Duration::seconds(5);
        sessions.get(&first).await.unwrap().touch(later);

        let third = sessions.insert(session()).await;
        assert_eq!(sessions.len().await, 2);
        assert!(sessions.get(&second).await.is_none());
        assert!(sessions.get(&first).await.is_some());
        assert!(sessions.get(&third).await.is_some());
    }

    #[tokio::test]
    async fn idle_sessions_are_pruned() {
        let limits = SessionLimits { idle_ttl: Duration::seconds(60), ..SessionLimits::default() };
        let sessions = SessionManager::new(limits);
        let idle = sessions.insert(session()).await;
        let active = sessions.insert(session()).await;

        let now = Utc::now() + Duration::seconds(90);
        sessions.get(&active).await.unwrap().touch(now);

        assert_eq!(sessions.prune_idle_at(now).await, 1);
        assert!(sessions.get(&idle).await.is_none());
        assert!(sessions.get(&active).await.is_some());
    }

    #[tokio::test]
    async fn recent_sessions_survive_pruning() {
        let sessions = SessionManager::default();
        let id = sessions.insert(session()).await;
        assert_eq!(sessions.prune_idle().await, 0);
        assert!(sessions.get(&id).await.is_some());
    }
}
