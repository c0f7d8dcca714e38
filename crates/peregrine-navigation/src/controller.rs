//! Navigation Controller

use std::sync::Arc;
use std::time::Duration;

use peregrine_engine::{EngineError, EngineSupervisor, PageLoad};
use peregrine_session::{NavigationEvent, SessionRegistry};
use peregrine_tabs::{
    HistoryDirection, NavigationKind, PendingNavigation, Tab, TabError, TabRegistry,
};

use crate::error::NavigationError;
use crate::Result;

/// Result of a back/forward request.
#[derive(Debug, Clone)]
pub enum HistoryOutcome {
    Navigated(Tab),
    /// No entry in that direction. Not an error; the tab is untouched.
    NoHistory,
}

/// What to ask the engine to do once a tab is claimed.
enum NavRequest {
    Goto(String),
    Reload,
}

pub struct NavigationController {
    supervisor: Arc<EngineSupervisor>,
    sessions: Arc<SessionRegistry>,
    tabs: Arc<TabRegistry>,
    load_timeout: Duration,
}

impl NavigationController {
    pub fn new(
        supervisor: Arc<EngineSupervisor>,
        sessions: Arc<SessionRegistry>,
        tabs: Arc<TabRegistry>,
        load_timeout: Duration,
    ) -> Self {
        Self {
            supervisor,
            sessions,
            tabs,
            load_timeout,
        }
    }

    /// Navigate a tab to a new URL.
    pub async fn navigate(&self, tab_id: &str, url: &str) -> Result<Tab> {
        validate_url(url)?;
        let pending = self.tabs.begin_navigation(tab_id)?;
        self.drive(tab_id, pending, NavRequest::Goto(url.to_string()), NavigationKind::Fresh)
            .await
    }

    /// Reload a tab's current document.
    pub async fn reload(&self, tab_id: &str) -> Result<Tab> {
        let pending = self.tabs.begin_navigation(tab_id)?;
        self.drive(tab_id, pending, NavRequest::Reload, NavigationKind::Reload)
            .await
    }

    /// Revisit the previous entry in the tab's history.
    pub async fn back(&self, tab_id: &str) -> Result<HistoryOutcome> {
        self.history_step(tab_id, HistoryDirection::Back).await
    }

    /// Revisit the next entry in the tab's history.
    pub async fn forward(&self, tab_id: &str) -> Result<HistoryOutcome> {
        self.history_step(tab_id, HistoryDirection::Forward).await
    }

    async fn history_step(
        &self,
        tab_id: &str,
        direction: HistoryDirection,
    ) -> Result<HistoryOutcome> {
        let Some(claim) = self.tabs.begin_history_navigation(tab_id, direction)? else {
            tracing::debug!(tab_id = %tab_id, ?direction, "No history entry in that direction");
            return Ok(HistoryOutcome::NoHistory);
        };

        let event = match self
            .sessions
            .event_at(&claim.pending.session_id, claim.log_index)
        {
            Ok(event) => event,
            Err(e) => {
                self.tabs.finish_failed(tab_id);
                return Err(e.into());
            }
        };

        let kind = match direction {
            HistoryDirection::Back => NavigationKind::Back,
            HistoryDirection::Forward => NavigationKind::Forward,
        };

        let tab = self
            .drive(tab_id, claim.pending, NavRequest::Goto(event.url), kind)
            .await?;
        Ok(HistoryOutcome::Navigated(tab))
    }

    /// Run a claimed navigation to completion, settling the tab either way.
    async fn drive(
        &self,
        tab_id: &str,
        pending: PendingNavigation,
        request: NavRequest,
        kind: NavigationKind,
    ) -> Result<Tab> {
        let engine = match self.supervisor.handle() {
            Ok(engine) => engine,
            Err(e) => {
                self.tabs.finish_failed(tab_id);
                return Err(e.into());
            }
        };

        let (url, load) = match request {
            NavRequest::Goto(url) => {
                let load = tokio::time::timeout(self.load_timeout, engine.goto(&pending.page, &url))
                    .await;
                (url, load)
            }
            NavRequest::Reload => {
                let load =
                    tokio::time::timeout(self.load_timeout, engine.reload(&pending.page)).await;
                (String::from("(reload)"), load)
            }
        };

        let load = match load {
            Ok(Ok(load)) => load,
            Ok(Err(e)) => {
                self.tabs.finish_failed(tab_id);
                let e = self.supervisor.note_engine_error(e);
                tracing::warn!(tab_id = %tab_id, url = %url, error = %e, "Navigation failed");
                return Err(match e {
                    EngineError::Navigation(message) => NavigationError::Failed(message),
                    other => NavigationError::Engine(other),
                });
            }
            Err(_) => {
                self.tabs.finish_failed(tab_id);
                let timeout_ms = self.load_timeout.as_millis() as u64;
                tracing::warn!(tab_id = %tab_id, url = %url, timeout_ms, "Navigation timed out");
                return Err(NavigationError::Timeout { url, timeout_ms });
            }
        };

        self.complete(tab_id, &pending.session_id, load, kind)
    }

    /// Append the navigation event and settle the tab as Loaded.
    fn complete(
        &self,
        tab_id: &str,
        session_id: &str,
        load: PageLoad,
        kind: NavigationKind,
    ) -> Result<Tab> {
        let event = NavigationEvent::new(load.url.clone(), load.title.clone(), tab_id.to_string());
        let log_index = match self.sessions.append_event(session_id, event) {
            Ok(index) => index,
            Err(_) => {
                // Session teardown raced the load; the result is dropped.
                self.tabs.finish_failed(tab_id);
                return Err(TabError::NotFound(tab_id.to_string()).into());
            }
        };

        let tab = self
            .tabs
            .finish_loaded(tab_id, load.url, load.title, log_index, kind)?;

        tracing::info!(tab_id = %tab_id, url = %tab.current_url, "Navigation completed");
        Ok(tab)
    }
}

/// Reject URLs the engine should never see.
fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(NavigationError::InvalidUrl("URL cannot be empty".to_string()));
    }

    let parsed = url::Url::parse(url)
        .map_err(|e| NavigationError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" | "about" => Ok(()),
        scheme => Err(NavigationError::InvalidUrl(format!(
            "unsupported scheme '{scheme}', only http/https allowed"
        ))),
    }
}
