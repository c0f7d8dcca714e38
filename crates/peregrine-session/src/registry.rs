//! Session Registry
//!
//! Owns every live session. Map structure changes take the outer lock
//! briefly; updates to one session take only that session's lock, so
//! unrelated sessions never contend. No lock is held across an engine call.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use peregrine_engine::EngineSupervisor;

use crate::error::SessionError;
use crate::session::{NavigationEvent, Session, SessionStatus};
use crate::Result;

pub struct SessionRegistry {
    supervisor: Arc<EngineSupervisor>,
    sessions: RwLock<HashMap<String, Arc<RwLock<Session>>>>,
}

impl SessionRegistry {
    pub fn new(supervisor: Arc<EngineSupervisor>) -> Self {
        Self {
            supervisor,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session backed by a fresh isolated browsing context.
    ///
    /// A caller-supplied id is used verbatim; an id that is already live is
    /// rejected rather than silently reused.
    pub async fn create_session(&self, client_id: Option<String>) -> Result<Session> {
        if let Some(id) = &client_id {
            if self.sessions.read().contains_key(id) {
                return Err(SessionError::AlreadyExists(id.clone()));
            }
        }

        let engine = self.supervisor.handle()?;
        let context = engine
            .create_context()
            .await
            .map_err(|e| self.supervisor.note_engine_error(e))?;

        let session = Session::new(client_id, context.clone());

        let inserted = {
            let mut sessions = self.sessions.write();
            match sessions.entry(session.id.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(RwLock::new(session.clone())));
                    true
                }
            }
        };

        if !inserted {
            // Lost a race on a supplied id; release the context we created.
            if let Err(e) = engine.close_context(&context).await {
                tracing::warn!(context_id = %context, error = %e, "Failed to release raced context");
            }
            return Err(SessionError::AlreadyExists(session.id));
        }

        tracing::info!(session_id = %session.id, context_id = %context, "Created session");
        Ok(session)
    }

    /// Snapshot of a session by id.
    pub fn get_session(&self, session_id: &str) -> Result<Session> {
        Ok(self.entry(session_id)?.read().clone())
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.sessions
            .read()
            .values()
            .map(|entry| entry.read().clone())
            .collect()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Register a tab under a session. Fails when the session is gone or no
    /// longer accepting tabs.
    pub fn add_tab(&self, session_id: &str, tab_id: &str) -> Result<()> {
        let entry = self.entry(session_id)?;
        let mut session = entry.write();
        if !session.is_active() {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        session.add_tab(tab_id.to_string());
        Ok(())
    }

    /// Drop a tab id from a session's owned set.
    pub fn remove_tab(&self, session_id: &str, tab_id: &str) -> Result<()> {
        let entry = self.entry(session_id)?;
        entry.write().remove_tab(tab_id);
        Ok(())
    }

    /// Append a navigation event, returning its index in the session log.
    pub fn append_event(&self, session_id: &str, event: NavigationEvent) -> Result<usize> {
        let entry = self.entry(session_id)?;
        let index = entry.write().append_event(event);
        Ok(index)
    }

    /// Read one event from the session log.
    pub fn event_at(&self, session_id: &str, index: usize) -> Result<NavigationEvent> {
        let entry = self.entry(session_id)?;
        let session = entry.read();
        session
            .history
            .get(index)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub fn set_status(&self, session_id: &str, status: SessionStatus) -> Result<()> {
        let entry = self.entry(session_id)?;
        entry.write().status = status;
        Ok(())
    }

    /// Deregister a session, returning its final record marked Closed.
    pub fn remove(&self, session_id: &str) -> Option<Session> {
        let entry = self.sessions.write().remove(session_id)?;
        let mut session = entry.read().clone();
        session.status = SessionStatus::Closed;
        tracing::info!(session_id = %session_id, "Removed session");
        Some(session)
    }

    fn entry(&self, session_id: &str) -> Result<Arc<RwLock<Session>>> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peregrine_engine::fake::FakeLauncher;
    use peregrine_engine::EngineError;

    async fn ready_registry() -> SessionRegistry {
        let supervisor = Arc::new(EngineSupervisor::new(Box::new(FakeLauncher::new())));
        supervisor.initialize().await.unwrap();
        SessionRegistry::new(supervisor)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let registry = ready_registry().await;
        let session = registry.create_session(None).await.unwrap();

        let fetched = registry.get_session(&session.id).unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.status, SessionStatus::Active);
        assert!(fetched.tab_ids.is_empty());
    }

    #[tokio::test]
    async fn test_create_without_engine_fails() {
        let supervisor = Arc::new(EngineSupervisor::new(Box::new(FakeLauncher::new())));
        let registry = SessionRegistry::new(supervisor);

        let err = registry.create_session(None).await.unwrap_err();
        assert!(matches!(err, SessionError::Engine(EngineError::Unavailable)));
    }

    #[tokio::test]
    async fn test_duplicate_supplied_id_rejected() {
        let registry = ready_registry().await;
        registry
            .create_session(Some("dup".into()))
            .await
            .unwrap();

        let err = registry
            .create_session(Some("dup".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists(_)));
        assert_eq!(registry.session_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let registry = ready_registry().await;
        assert!(matches!(
            registry.get_session("missing"),
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            registry.add_tab("missing", "tab-1"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_closing_session_rejects_new_tabs() {
        let registry = ready_registry().await;
        let session = registry.create_session(None).await.unwrap();

        registry
            .set_status(&session.id, SessionStatus::Closing)
            .unwrap();
        assert!(matches!(
            registry.add_tab(&session.id, "tab-1"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_tab_registration_loses_nothing() {
        let registry = Arc::new(ready_registry().await);
        let session = registry.create_session(None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let registry = Arc::clone(&registry);
            let session_id = session.id.clone();
            handles.push(tokio::spawn(async move {
                registry.add_tab(&session_id, &format!("tab-{i}"))
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(registry.get_session(&session.id).unwrap().tab_count(), 10);
    }

    #[tokio::test]
    async fn test_remove_marks_closed() {
        let registry = ready_registry().await;
        let session = registry.create_session(None).await.unwrap();

        let removed = registry.remove(&session.id).unwrap();
        assert_eq!(removed.status, SessionStatus::Closed);
        assert!(matches!(
            registry.get_session(&session.id),
            Err(SessionError::NotFound(_))
        ));
    }
}
