//! Tab Registry
//!
//! Owns every live tab across all sessions. Tab ids are unique process-wide
//! and never reused. As with sessions, map changes take the outer lock
//! briefly and per-tab updates take only that tab's lock; engine calls
//! happen with no lock held.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use peregrine_engine::{EngineSupervisor, PageId};
use peregrine_session::SessionRegistry;

use crate::error::TabError;
use crate::state::TabState;
use crate::tab::{NavigationKind, Tab, TabInfo};
use crate::Result;

/// Direction of a history traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    Back,
    Forward,
}

/// Claim on a tab whose navigation is now in flight.
#[derive(Debug, Clone)]
pub struct PendingNavigation {
    pub page: PageId,
    pub session_id: String,
}

/// Claim on a tab plus the log entry a history traversal targets.
#[derive(Debug, Clone)]
pub struct PendingHistoryNavigation {
    pub pending: PendingNavigation,
    pub log_index: usize,
}

pub struct TabRegistry {
    supervisor: Arc<EngineSupervisor>,
    sessions: Arc<SessionRegistry>,
    tabs: RwLock<HashMap<String, Arc<RwLock<Tab>>>>,
}

impl TabRegistry {
    pub fn new(supervisor: Arc<EngineSupervisor>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            supervisor,
            sessions,
            tabs: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new blank tab inside a session.
    ///
    /// Fails with the session's NotFound when it is absent or no longer
    /// Active. If the session disappears between page creation and
    /// registration, the page is closed best-effort and the call fails.
    pub async fn create_tab(&self, session_id: &str) -> Result<Tab> {
        let session = self.sessions.get_session(session_id)?;
        if !session.is_active() {
            return Err(peregrine_session::SessionError::NotFound(session_id.to_string()).into());
        }

        let engine = self.supervisor.handle()?;
        let page = engine
            .new_page(&session.context)
            .await
            .map_err(|e| self.supervisor.note_engine_error(e))?;

        let tab = Tab::new(session_id.to_string(), page.clone());
        self.tabs
            .write()
            .insert(tab.id.clone(), Arc::new(RwLock::new(tab.clone())));

        if let Err(e) = self.sessions.add_tab(session_id, &tab.id) {
            // The session closed under us; undo the registration.
            self.tabs.write().remove(&tab.id);
            if let Err(close_err) = engine.close_page(&page).await {
                tracing::warn!(page_id = %page, error = %close_err, "Failed to release orphaned page");
            }
            return Err(e.into());
        }

        tracing::info!(tab_id = %tab.id, session_id = %session_id, "Created tab");
        Ok(tab)
    }

    /// Snapshot of a tab by id.
    pub fn get_tab(&self, tab_id: &str) -> Result<Tab> {
        Ok(self.entry(tab_id)?.read().clone())
    }

    pub fn get_tab_info(&self, tab_id: &str) -> Result<TabInfo> {
        Ok(TabInfo::from(&*self.entry(tab_id)?.read()))
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.read().len()
    }

    /// Refresh a tab's last-active timestamp.
    pub fn touch(&self, tab_id: &str) -> Result<()> {
        self.entry(tab_id)?.write().touch();
        Ok(())
    }

    pub fn set_pinned(&self, tab_id: &str, pinned: bool) -> Result<Tab> {
        let entry = self.entry(tab_id)?;
        let mut tab = entry.write();
        tab.pinned = pinned;
        tab.touch();
        Ok(tab.clone())
    }

    pub fn set_group(&self, tab_id: &str, group_id: Option<String>) -> Result<Tab> {
        let entry = self.entry(tab_id)?;
        let mut tab = entry.write();
        tab.group_id = group_id;
        tab.touch();
        Ok(tab.clone())
    }

    /// Claim a tab for navigation. Single-writer: a tab that is already
    /// Navigating rejects the claim with Busy.
    pub fn begin_navigation(&self, tab_id: &str) -> Result<PendingNavigation> {
        let entry = self.entry(tab_id)?;
        let mut tab = entry.write();
        if tab.state == TabState::Navigating {
            return Err(TabError::Busy(tab_id.to_string()));
        }
        tab.transition_to(TabState::Navigating)?;
        Ok(PendingNavigation {
            page: tab.page.clone(),
            session_id: tab.session_id.clone(),
        })
    }

    /// Claim a tab for a history traversal.
    ///
    /// Returns `Ok(None)` when there is no entry in that direction — not an
    /// error, and the tab's state is left untouched.
    pub fn begin_history_navigation(
        &self,
        tab_id: &str,
        direction: HistoryDirection,
    ) -> Result<Option<PendingHistoryNavigation>> {
        let entry = self.entry(tab_id)?;
        let mut tab = entry.write();
        if tab.state == TabState::Navigating {
            return Err(TabError::Busy(tab_id.to_string()));
        }

        let target = match direction {
            HistoryDirection::Back => tab.prior_entry(),
            HistoryDirection::Forward => tab.next_entry(),
        };
        let Some(log_index) = target else {
            return Ok(None);
        };

        tab.transition_to(TabState::Navigating)?;
        Ok(Some(PendingHistoryNavigation {
            pending: PendingNavigation {
                page: tab.page.clone(),
                session_id: tab.session_id.clone(),
            },
            log_index,
        }))
    }

    /// Settle an in-flight navigation as Loaded.
    ///
    /// Fails with NotFound when the tab was closed while the load was in
    /// flight; the caller drops the result in that case.
    pub fn finish_loaded(
        &self,
        tab_id: &str,
        url: String,
        title: String,
        log_index: usize,
        kind: NavigationKind,
    ) -> Result<Tab> {
        let entry = self.entry(tab_id)?;
        let mut tab = entry.write();
        tab.record_loaded(url, title, log_index, kind)?;
        Ok(tab.clone())
    }

    /// Settle an in-flight navigation as Failed. Tolerant: a tab closed
    /// mid-flight is simply gone and there is nothing left to mark.
    pub fn finish_failed(&self, tab_id: &str) {
        if let Ok(entry) = self.entry(tab_id) {
            let mut tab = entry.write();
            if tab.state == TabState::Navigating {
                let _ = tab.transition_to(TabState::Failed);
            }
        }
    }

    /// Close a tab: deregister it, detach it from its session, then close
    /// the underlying page. Bookkeeping is gone even when the engine close
    /// fails; that failure is propagated to the caller.
    pub async fn close_tab(&self, tab_id: &str) -> Result<()> {
        let entry = self
            .tabs
            .write()
            .remove(tab_id)
            .ok_or_else(|| TabError::NotFound(tab_id.to_string()))?;
        let tab = entry.read().clone();

        // The session may already be mid-teardown; its absence is fine here.
        let _ = self.sessions.remove_tab(&tab.session_id, tab_id);

        let engine = self.supervisor.handle()?;
        engine
            .close_page(&tab.page)
            .await
            .map_err(|e| self.supervisor.note_engine_error(e))?;

        tracing::info!(tab_id = %tab_id, session_id = %tab.session_id, "Closed tab");
        Ok(())
    }

    /// Deregister a tab without touching the engine or its session.
    /// Teardown paths close pages themselves and tolerate failures.
    pub fn remove_entry(&self, tab_id: &str) -> Option<Tab> {
        let entry = self.tabs.write().remove(tab_id)?;
        let tab = entry.read().clone();
        Some(tab)
    }

    fn entry(&self, tab_id: &str) -> Result<Arc<RwLock<Tab>>> {
        self.tabs
            .read()
            .get(tab_id)
            .cloned()
            .ok_or_else(|| TabError::NotFound(tab_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peregrine_engine::fake::{FakeEngine, FakeLauncher};
    use peregrine_session::SessionError;

    async fn fixtures() -> (Arc<FakeEngine>, Arc<SessionRegistry>, TabRegistry) {
        let launcher = FakeLauncher::new();
        let engine = launcher.engine();
        let supervisor = Arc::new(EngineSupervisor::new(Box::new(launcher)));
        supervisor.initialize().await.unwrap();
        let sessions = Arc::new(SessionRegistry::new(Arc::clone(&supervisor)));
        let tabs = TabRegistry::new(supervisor, Arc::clone(&sessions));
        (engine, sessions, tabs)
    }

    #[tokio::test]
    async fn test_create_tab_registers_under_session() {
        let (engine, sessions, tabs) = fixtures().await;
        let session = sessions.create_session(None).await.unwrap();

        let tab = tabs.create_tab(&session.id).await.unwrap();
        assert_eq!(tab.state, TabState::Idle);
        assert_eq!(sessions.get_session(&session.id).unwrap().tab_ids, vec![tab.id.clone()]);
        assert_eq!(engine.page_count(), 1);
    }

    #[tokio::test]
    async fn test_create_tab_unknown_session_creates_nothing() {
        let (engine, _sessions, tabs) = fixtures().await;

        let err = tabs.create_tab("missing").await.unwrap_err();
        assert!(matches!(err, TabError::Session(SessionError::NotFound(_))));
        assert_eq!(tabs.tab_count(), 0);
        assert_eq!(engine.page_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_create_tab_no_lost_updates() {
        let (_engine, sessions, tabs) = fixtures().await;
        let tabs = Arc::new(tabs);
        let session = sessions.create_session(None).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let tabs = Arc::clone(&tabs);
            let session_id = session.id.clone();
            handles.push(tokio::spawn(async move { tabs.create_tab(&session_id).await }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            let tab = handle.await.unwrap().unwrap();
            ids.insert(tab.id);
        }

        assert_eq!(ids.len(), 10);
        assert_eq!(tabs.tab_count(), 10);
        assert_eq!(sessions.get_session(&session.id).unwrap().tab_count(), 10);
    }

    #[tokio::test]
    async fn test_busy_tab_rejects_second_claim() {
        let (_engine, sessions, tabs) = fixtures().await;
        let session = sessions.create_session(None).await.unwrap();
        let tab = tabs.create_tab(&session.id).await.unwrap();

        tabs.begin_navigation(&tab.id).unwrap();
        let err = tabs.begin_navigation(&tab.id).unwrap_err();
        assert!(matches!(err, TabError::Busy(_)));
    }

    #[tokio::test]
    async fn test_close_tab_removes_everywhere() {
        let (engine, sessions, tabs) = fixtures().await;
        let session = sessions.create_session(None).await.unwrap();
        let tab = tabs.create_tab(&session.id).await.unwrap();

        tabs.close_tab(&tab.id).await.unwrap();
        assert!(matches!(tabs.get_tab(&tab.id), Err(TabError::NotFound(_))));
        assert_eq!(sessions.get_session(&session.id).unwrap().tab_count(), 0);
        assert_eq!(engine.page_count(), 0);

        let err = tabs.close_tab(&tab.id).await.unwrap_err();
        assert!(matches!(err, TabError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_finish_failed_after_close_is_noop() {
        let (_engine, sessions, tabs) = fixtures().await;
        let session = sessions.create_session(None).await.unwrap();
        let tab = tabs.create_tab(&session.id).await.unwrap();

        tabs.begin_navigation(&tab.id).unwrap();
        tabs.remove_entry(&tab.id);
        // The in-flight navigation settles after the tab is gone.
        tabs.finish_failed(&tab.id);
        assert!(matches!(tabs.get_tab(&tab.id), Err(TabError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pin_and_group_metadata() {
        let (_engine, sessions, tabs) = fixtures().await;
        let session = sessions.create_session(None).await.unwrap();
        let tab = tabs.create_tab(&session.id).await.unwrap();

        let pinned = tabs.set_pinned(&tab.id, true).unwrap();
        assert!(pinned.pinned);

        let grouped = tabs.set_group(&tab.id, Some("research".into())).unwrap();
        assert_eq!(grouped.group_id.as_deref(), Some("research"));

        let info = tabs.get_tab_info(&tab.id).unwrap();
        assert!(info.pinned);
        assert_eq!(info.group_id.as_deref(), Some("research"));
    }
}
