//! Browser service facade

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use peregrine_engine::{ChromiumLauncher, EngineLauncher, EngineSupervisor, CAPABILITIES};
use peregrine_extract::{ContentExtractor, ContentSnapshot};
use peregrine_navigation::{HistoryOutcome, NavigationController};
use peregrine_session::{Session, SessionRegistry};
use peregrine_tabs::{Tab, TabInfo, TabRegistry};

use crate::cleanup::{CleanupCoordinator, CleanupReport};
use crate::config::Config;
use crate::Result;

/// Engine readiness and registry counts, for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub engine_ready: bool,
    pub active_sessions: usize,
    pub active_tabs: usize,
    pub capabilities: Vec<String>,
}

/// The one entry point request handlers talk to.
///
/// Owns the supervisor and both registries; navigation, extraction and
/// cleanup all operate on the same shared stores, so there is exactly one
/// source of truth for what exists.
pub struct BrowserService {
    supervisor: Arc<EngineSupervisor>,
    sessions: Arc<SessionRegistry>,
    tabs: Arc<TabRegistry>,
    navigation: NavigationController,
    extractor: ContentExtractor,
    cleanup: CleanupCoordinator,
}

impl BrowserService {
    /// Service backed by a launched Chromium process.
    pub fn new(config: Config) -> Self {
        let launcher = Box::new(ChromiumLauncher::new(config.engine.clone()));
        Self::with_launcher(launcher, config)
    }

    /// Service backed by any launcher; tests hand in a fake engine here.
    pub fn with_launcher(launcher: Box<dyn EngineLauncher>, config: Config) -> Self {
        let supervisor = Arc::new(EngineSupervisor::new(launcher));
        let sessions = Arc::new(SessionRegistry::new(Arc::clone(&supervisor)));
        let tabs = Arc::new(TabRegistry::new(
            Arc::clone(&supervisor),
            Arc::clone(&sessions),
        ));
        let navigation = NavigationController::new(
            Arc::clone(&supervisor),
            Arc::clone(&sessions),
            Arc::clone(&tabs),
            config.navigation_timeout(),
        );
        let extractor = ContentExtractor::new(
            Arc::clone(&supervisor),
            Arc::clone(&tabs),
            config.script_timeout(),
            config.capture_timeout(),
        );
        let cleanup = CleanupCoordinator::new(
            Arc::clone(&supervisor),
            Arc::clone(&sessions),
            Arc::clone(&tabs),
            config.cleanup_timeout(),
        );

        Self {
            supervisor,
            sessions,
            tabs,
            navigation,
            extractor,
            cleanup,
        }
    }

    /// Launch the engine. Idempotent; must succeed before sessions or tabs
    /// can be created.
    pub async fn initialize(&self) -> Result<()> {
        self.supervisor.initialize().await?;
        Ok(())
    }

    // === Session operations ===

    pub async fn create_session(&self, client_id: Option<String>) -> Result<Session> {
        Ok(self.sessions.create_session(client_id).await?)
    }

    pub fn get_session(&self, session_id: &str) -> Result<Session> {
        Ok(self.sessions.get_session(session_id)?)
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.sessions.list_sessions()
    }

    /// Close a session and everything in it. Unknown ids are an explicit
    /// error here; only the bulk teardown paths tolerate them.
    pub async fn close_session(&self, session_id: &str) -> Result<CleanupReport> {
        self.sessions.get_session(session_id)?;
        Ok(self.cleanup.cleanup_session(session_id).await)
    }

    // === Tab operations ===

    /// Create a tab, then immediately navigate it when `initial_url` is
    /// non-empty. A failed initial navigation leaves the tab registered in
    /// Failed state and surfaces the error.
    pub async fn create_tab(&self, session_id: &str, initial_url: Option<&str>) -> Result<Tab> {
        let tab = self.tabs.create_tab(session_id).await?;
        match initial_url {
            Some(url) if !url.is_empty() => Ok(self.navigation.navigate(&tab.id, url).await?),
            _ => Ok(tab),
        }
    }

    pub fn get_tab_info(&self, tab_id: &str) -> Result<TabInfo> {
        Ok(self.tabs.get_tab_info(tab_id)?)
    }

    pub async fn close_tab(&self, tab_id: &str) -> Result<()> {
        Ok(self.tabs.close_tab(tab_id).await?)
    }

    pub fn set_pinned(&self, tab_id: &str, pinned: bool) -> Result<Tab> {
        Ok(self.tabs.set_pinned(tab_id, pinned)?)
    }

    pub fn set_group(&self, tab_id: &str, group_id: Option<String>) -> Result<Tab> {
        Ok(self.tabs.set_group(tab_id, group_id)?)
    }

    // === Navigation operations ===

    pub async fn navigate(&self, tab_id: &str, url: &str) -> Result<Tab> {
        Ok(self.navigation.navigate(tab_id, url).await?)
    }

    pub async fn reload(&self, tab_id: &str) -> Result<Tab> {
        Ok(self.navigation.reload(tab_id).await?)
    }

    pub async fn back(&self, tab_id: &str) -> Result<HistoryOutcome> {
        Ok(self.navigation.back(tab_id).await?)
    }

    pub async fn forward(&self, tab_id: &str) -> Result<HistoryOutcome> {
        Ok(self.navigation.forward(tab_id).await?)
    }

    // === Extraction operations ===

    pub async fn get_content(&self, tab_id: &str) -> Result<ContentSnapshot> {
        Ok(self.extractor.get_content(tab_id).await?)
    }

    pub async fn evaluate(&self, tab_id: &str, expression: &str) -> Result<serde_json::Value> {
        Ok(self.extractor.evaluate(tab_id, expression).await?)
    }

    pub async fn screenshot(&self, tab_id: &str, full_page: bool) -> Result<ContentSnapshot> {
        Ok(self.extractor.screenshot(tab_id, full_page).await?)
    }

    // === Lifecycle ===

    pub fn health(&self) -> HealthReport {
        HealthReport {
            engine_ready: self.supervisor.is_ready(),
            active_sessions: self.sessions.session_count(),
            active_tabs: self.tabs.tab_count(),
            capabilities: CAPABILITIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Tear everything down, then terminate the engine process.
    pub async fn shutdown(&self) -> Vec<CleanupReport> {
        tracing::info!("Shutting down browser service");
        self.cleanup.cleanup_all().await
    }
}
