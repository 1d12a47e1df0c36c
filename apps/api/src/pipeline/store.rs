use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::pipeline::runner::SharedSession;
use crate::pipeline::state_machine::EstimationSession;

/// In-memory registry of live sessions. Nothing is persisted.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
}

impl SessionStore {
    pub async fn create(&self, country: &str) -> SharedSession {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(EstimationSession::new(id, country)));
        self.sessions.write().await.insert(id, session.clone());
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Removes the session and cancels any run it has in flight.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(session) => {
                session.lock().await.abandon();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions untouched for at least `ttl`. Sessions with a run in flight are kept.
    ///
    /// Candidates are re-checked under the write lock, so a session touched after the
    /// first pass survives. Evicted sessions are abandoned to void outstanding tickets.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let candidates: Vec<(Uuid, SharedSession)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, s)| (*id, s.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, session) in candidates {
            // A session someone holds right now is in use, not idle.
            let Ok(session) = session.try_lock() else {
                continue;
            };
            if is_expired(&session, ttl) {
                expired.push(id);
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let mut evicted = 0;
        for id in expired {
            let Some(shared) = sessions.get(&id).cloned() else {
                continue;
            };
            let Ok(mut session) = shared.try_lock() else {
                continue;
            };
            if !is_expired(&session, ttl) {
                continue;
            }
            session.abandon();
            drop(session);
            sessions.remove(&id);
            evicted += 1;
        }
        evicted
    }
}

fn is_expired(session: &EstimationSession, ttl: Duration) -> bool {
    let idle_for = (Utc::now() - session.updated_at())
        .to_std()
        .unwrap_or_default();
    !session.status().is_running() && idle_for >= ttl
}

/// Periodically evicts idle sessions for the lifetime of the process.
pub fn spawn_janitor(store: SessionStore, ttl: Duration) -> tokio::task::JoinHandle<()> {
    let period = (ttl / 4).max(Duration::from_secs(30));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = store.evict_idle(ttl).await;
            if evicted > 0 {
                info!("Evicted {evicted} idle session(s), {} live", store.len().await);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::estimate::EstimationResult;
    use crate::models::wage::WageData;

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = SessionStore::default();
        let session = store.create("Poland").await;
        let id = session.lock().await.id();

        assert!(store.get(id).await.is_some());
        assert_eq!(store.len().await, 1);
        assert!(store.remove(id).await);
        assert!(store.get(id).await.is_none());
        assert!(!store.remove(id).await);
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_running_sessions() {
        let store = SessionStore::default();
        store.create("India").await;
        let running = store.create("Brazil").await;
        let ticket = {
            let mut s = running.lock().await;
            s.set_requirements("Chat app").unwrap();
            s.submit().unwrap()
        };

        assert_eq!(store.evict_idle(Duration::ZERO).await, 1);
        assert_eq!(store.len().await, 1);
        assert!(!ticket.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_evicted_session_voids_pending_chat() {
        let store = SessionStore::default();
        let session = store.create("India").await;
        let chat = {
            let mut s = session.lock().await;
            s.set_requirements("Inventory tracker").unwrap();
            let run = s.submit().unwrap();
            let wage = WageData::fallback("India");
            let result: EstimationResult = serde_json::from_value(json!({
                "projectName": "Inventory", "summary": "",
                "totalCost": {"min": 1.0, "avg": 2.0, "max": 3.0},
                "timelineWeeks": {"min": 1.0, "max": 2.0},
                "componentCosts": {"backend": 0.0, "frontend": 0.0, "devops": 0.0, "qa": 0.0},
                "infrastructureCostMonthly": 0.0, "thirdPartyLicensesCost": 0.0,
                "assumptions": [], "wageDataUsed": wage,
            }))
            .unwrap();
            assert!(s.market_resolved(run.epoch, wage));
            assert!(s.estimate_resolved(run.epoch, result));
            s.begin_chat("Cheaper?").unwrap()
        };

        assert_eq!(store.evict_idle(Duration::ZERO).await, 1);
        assert!(session.lock().await.finish_chat(&chat, Ok("Yes".into())).is_none());
    }

    #[tokio::test]
    async fn test_evict_idle_skips_session_in_use() {
        let store = SessionStore::default();
        let session = store.create("Canada").await;
        let guard = session.lock().await;

        assert_eq!(store.evict_idle(Duration::ZERO).await, 0);
        drop(guard);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_fresh_sessions_survive_long_ttl() {
        let store = SessionStore::default();
        store.create("Canada").await;
        assert_eq!(store.evict_idle(Duration::from_secs(3600)).await, 0);
    }
}
