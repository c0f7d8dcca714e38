//! Cleanup Coordinator
//!
//! Teardown favors completeness of deregistration over strict error
//! propagation: every engine close is best-effort and bounded by its own
//! timeout, failures are itemized instead of raised, and the registries are
//! always left without stale references.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use peregrine_engine::EngineSupervisor;
use peregrine_session::{SessionRegistry, SessionStatus};
use peregrine_tabs::TabRegistry;

/// One engine-facing close that did not go cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupFailure {
    /// What was being closed, e.g. `tab <id>` or `context <id>`.
    pub target: String,
    pub error: String,
}

/// Outcome of tearing one session down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    pub session_id: String,
    /// Tabs deregistered during this cleanup.
    pub tabs_closed: Vec<String>,
    /// Partial failures; the bookkeeping was removed regardless.
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            tabs_closed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, target: String, error: String) {
        self.failures.push(CleanupFailure { target, error });
    }
}

pub struct CleanupCoordinator {
    supervisor: Arc<EngineSupervisor>,
    sessions: Arc<SessionRegistry>,
    tabs: Arc<TabRegistry>,
    /// Bound on each individual engine close call.
    op_timeout: Duration,
}

impl CleanupCoordinator {
    pub fn new(
        supervisor: Arc<EngineSupervisor>,
        sessions: Arc<SessionRegistry>,
        tabs: Arc<TabRegistry>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            supervisor,
            sessions,
            tabs,
            op_timeout,
        }
    }

    /// Tear down one session: close every owned tab, release the context,
    /// remove the bookkeeping. Tolerant of entities that are already gone.
    pub async fn cleanup_session(&self, session_id: &str) -> CleanupReport {
        let mut report = CleanupReport::new(session_id);

        let Ok(session) = self.sessions.get_session(session_id) else {
            tracing::debug!(session_id = %session_id, "Cleanup of unknown session is a no-op");
            return report;
        };

        let _ = self.sessions.set_status(session_id, SessionStatus::Closing);

        // When the engine is gone its pages and contexts died with it;
        // deregistration is all that is left to do.
        let engine = self.supervisor.handle().ok();

        for tab_id in &session.tab_ids {
            let Some(tab) = self.tabs.remove_entry(tab_id) else {
                continue;
            };

            if let Some(engine) = &engine {
                match tokio::time::timeout(self.op_timeout, engine.close_page(&tab.page)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        let e = self.supervisor.note_engine_error(e);
                        report.fail(format!("tab {tab_id}"), e.to_string());
                    }
                    Err(_) => {
                        report.fail(format!("tab {tab_id}"), "close timed out".to_string());
                    }
                }
            }
            report.tabs_closed.push(tab_id.clone());
        }

        if let Some(engine) = &engine {
            match tokio::time::timeout(self.op_timeout, engine.close_context(&session.context)).await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let e = self.supervisor.note_engine_error(e);
                    report.fail(format!("context {}", session.context), e.to_string());
                }
                Err(_) => {
                    report.fail(
                        format!("context {}", session.context),
                        "close timed out".to_string(),
                    );
                }
            }
        }

        self.sessions.remove(session_id);

        tracing::info!(
            session_id = %session_id,
            tabs = report.tabs_closed.len(),
            failures = report.failures.len(),
            "Cleaned up session"
        );
        report
    }

    /// Tear down every session, then terminate the engine process.
    pub async fn cleanup_all(&self) -> Vec<CleanupReport> {
        let session_ids = self.sessions.session_ids();
        let mut reports = Vec::with_capacity(session_ids.len());
        for session_id in session_ids {
            reports.push(self.cleanup_session(&session_id).await);
        }

        self.supervisor.terminate().await;

        tracing::info!(sessions = reports.len(), "Cleaned up all sessions");
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peregrine_engine::fake::{FakeEngine, FakeLauncher};

    struct Fixture {
        engine: Arc<FakeEngine>,
        supervisor: Arc<EngineSupervisor>,
        sessions: Arc<SessionRegistry>,
        tabs: Arc<TabRegistry>,
        cleanup: CleanupCoordinator,
    }

    async fn fixture() -> Fixture {
        let launcher = FakeLauncher::new();
        let engine = launcher.engine();
        let supervisor = Arc::new(EngineSupervisor::new(Box::new(launcher)));
        supervisor.initialize().await.unwrap();
        let sessions = Arc::new(SessionRegistry::new(Arc::clone(&supervisor)));
        let tabs = Arc::new(TabRegistry::new(
            Arc::clone(&supervisor),
            Arc::clone(&sessions),
        ));
        let cleanup = CleanupCoordinator::new(
            Arc::clone(&supervisor),
            Arc::clone(&sessions),
            Arc::clone(&tabs),
            Duration::from_millis(500),
        );
        Fixture {
            engine,
            supervisor,
            sessions,
            tabs,
            cleanup,
        }
    }

    #[tokio::test]
    async fn test_cleanup_session_releases_everything() {
        let fx = fixture().await;
        let session = fx.sessions.create_session(None).await.unwrap();
        let tab_a = fx.tabs.create_tab(&session.id).await.unwrap();
        let tab_b = fx.tabs.create_tab(&session.id).await.unwrap();

        let report = fx.cleanup.cleanup_session(&session.id).await;
        assert!(report.is_clean());
        assert_eq!(report.tabs_closed.len(), 2);

        assert!(fx.sessions.get_session(&session.id).is_err());
        assert!(fx.tabs.get_tab(&tab_a.id).is_err());
        assert!(fx.tabs.get_tab(&tab_b.id).is_err());
        assert_eq!(fx.engine.page_count(), 0);
        assert_eq!(fx.engine.context_count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_failing_page_close() {
        let fx = fixture().await;
        let session = fx.sessions.create_session(None).await.unwrap();
        let tab = fx.tabs.create_tab(&session.id).await.unwrap();
        fx.engine.refuse_page_close(&tab.page);

        let report = fx.cleanup.cleanup_session(&session.id).await;
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].target.contains(&tab.id));

        // Deregistration happened regardless of the engine failure.
        assert!(fx.sessions.get_session(&session.id).is_err());
        assert!(fx.tabs.get_tab(&tab.id).is_err());
    }

    #[tokio::test]
    async fn test_cleanup_unknown_session_is_noop() {
        let fx = fixture().await;
        let report = fx.cleanup.cleanup_session("missing").await;
        assert!(report.is_clean());
        assert!(report.tabs_closed.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_all_terminates_engine() {
        let fx = fixture().await;
        for _ in 0..3 {
            let session = fx.sessions.create_session(None).await.unwrap();
            fx.tabs.create_tab(&session.id).await.unwrap();
        }

        let reports = fx.cleanup.cleanup_all().await;
        assert_eq!(reports.len(), 3);
        assert_eq!(fx.sessions.session_count(), 0);
        assert_eq!(fx.tabs.tab_count(), 0);
        assert!(!fx.supervisor.is_ready());
    }
}
