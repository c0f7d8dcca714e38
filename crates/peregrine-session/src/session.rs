//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use peregrine_engine::ContextId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session accepts tab creation and operations.
    Active,
    /// Teardown has begun; no new tabs.
    Closing,
    /// All tabs closed and the context released.
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Closing => "closing",
            SessionStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of one completed navigation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationEvent {
    pub url: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    /// Tab the load completed in.
    pub tab_id: String,
}

impl NavigationEvent {
    pub fn new(url: String, title: String, tab_id: String) -> Self {
        Self {
            url,
            title,
            timestamp: Utc::now(),
            tab_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier, caller-supplied or generated.
    pub id: String,
    /// Engine handle for the isolated browsing context.
    pub context: ContextId,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    /// Ids of the tabs this session owns, in creation order.
    pub tab_ids: Vec<String>,
    /// Append-only log of completed navigations.
    pub history: Vec<NavigationEvent>,
}

impl Session {
    pub fn new(id: Option<String>, context: ContextId) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            context,
            status: SessionStatus::Active,
            created_at: Utc::now(),
            tab_ids: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Add a tab id to the owned set.
    pub fn add_tab(&mut self, tab_id: String) {
        if !self.tab_ids.contains(&tab_id) {
            self.tab_ids.push(tab_id);
        }
    }

    /// Remove a tab id from the owned set.
    pub fn remove_tab(&mut self, tab_id: &str) {
        self.tab_ids.retain(|id| id != tab_id);
    }

    pub fn tab_count(&self) -> usize {
        self.tab_ids.len()
    }

    /// Append an event and return its index in the log.
    pub fn append_event(&mut self, event: NavigationEvent) -> usize {
        self.history.push(event);
        self.history.len() - 1
    }
}
