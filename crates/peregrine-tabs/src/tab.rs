//! Tab data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use peregrine_engine::PageId;

use crate::error::TabError;
use crate::state::TabState;
use crate::Result;

/// How a completed load relates to the tab's back/forward position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// A new destination; discards any forward entries.
    Fresh,
    /// Revisit of the previous chain entry.
    Back,
    /// Revisit of the next chain entry.
    Forward,
    /// Same destination loaded again.
    Reload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    /// Unique identifier, never reused.
    pub id: String,
    /// Owning session, by id. Resolved through the session registry.
    pub session_id: String,
    /// Engine handle for the underlying page.
    pub page: PageId,
    /// URL of the last completed load, empty until the first one.
    pub current_url: String,
    pub title: String,
    pub state: TabState,
    pub pinned: bool,
    pub group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Back/forward chain: indices into the owning session's navigation log.
    #[serde(skip)]
    pub(crate) chain: Vec<usize>,
    /// Position within `chain`, `None` before the first completed load.
    #[serde(skip)]
    pub(crate) cursor: Option<usize>,
}

impl Tab {
    pub fn new(session_id: String, page: PageId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            session_id,
            page,
            current_url: String::new(),
            title: String::new(),
            state: TabState::Idle,
            pinned: false,
            group_id: None,
            created_at: now,
            last_active: now,
            chain: Vec::new(),
            cursor: None,
        }
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, new_state: TabState) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            return Err(TabError::InvalidTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }

        tracing::debug!(
            tab_id = %self.id,
            from = %self.state,
            to = %new_state,
            "Tab state transition"
        );

        self.state = new_state;
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Number of entries reachable through back/forward.
    pub fn history_len(&self) -> usize {
        self.chain.len()
    }

    /// Log index of the entry behind the current position, if any.
    pub(crate) fn prior_entry(&self) -> Option<usize> {
        let cursor = self.cursor?;
        if cursor == 0 {
            return None;
        }
        self.chain.get(cursor - 1).copied()
    }

    /// Log index of the entry ahead of the current position, if any.
    pub(crate) fn next_entry(&self) -> Option<usize> {
        let cursor = self.cursor?;
        self.chain.get(cursor + 1).copied()
    }

    /// Settle an in-flight navigation as Loaded and update the chain.
    ///
    /// `log_index` is where the owning session appended the event for this
    /// load; history revisits overwrite their chain slot with it so the slot
    /// always points at the freshest record for that position.
    pub(crate) fn record_loaded(
        &mut self,
        url: String,
        title: String,
        log_index: usize,
        kind: NavigationKind,
    ) -> Result<()> {
        self.transition_to(TabState::Loaded)?;
        self.current_url = url;
        self.title = title;

        match kind {
            NavigationKind::Fresh => {
                if let Some(cursor) = self.cursor {
                    self.chain.truncate(cursor + 1);
                } else {
                    self.chain.clear();
                }
                self.chain.push(log_index);
                self.cursor = Some(self.chain.len() - 1);
            }
            NavigationKind::Back => {
                if let Some(cursor) = self.cursor {
                    if cursor > 0 {
                        self.chain[cursor - 1] = log_index;
                        self.cursor = Some(cursor - 1);
                    }
                }
            }
            NavigationKind::Forward => {
                if let Some(cursor) = self.cursor {
                    if cursor + 1 < self.chain.len() {
                        self.chain[cursor + 1] = log_index;
                        self.cursor = Some(cursor + 1);
                    }
                }
            }
            NavigationKind::Reload => match self.cursor {
                Some(cursor) => self.chain[cursor] = log_index,
                None => {
                    self.chain.push(log_index);
                    self.cursor = Some(0);
                }
            },
        }

        Ok(())
    }
}

/// Flat record returned by tab lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: String,
    pub session_id: String,
    pub url: String,
    pub title: String,
    pub state: String,
    pub is_loading: bool,
    pub history_len: usize,
    pub pinned: bool,
    pub group_id: Option<String>,
    pub last_active: DateTime<Utc>,
}

impl From<&Tab> for TabInfo {
    fn from(tab: &Tab) -> Self {
        Self {
            id: tab.id.clone(),
            session_id: tab.session_id.clone(),
            url: tab.current_url.clone(),
            title: tab.title.clone(),
            state: tab.state.as_str().to_string(),
            is_loading: tab.is_loading(),
            history_len: tab.history_len(),
            pinned: tab.pinned,
            group_id: tab.group_id.clone(),
            last_active: tab.last_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_tab() -> Tab {
        Tab::new("session-1".to_string(), PageId("page-1".into()))
    }

    #[test]
    fn test_new_tab_is_idle() {
        let tab = fresh_tab();
        assert_eq!(tab.state, TabState::Idle);
        assert!(tab.current_url.is_empty());
        assert_eq!(tab.history_len(), 0);
    }

    #[test]
    fn test_fresh_load_advances_chain() {
        let mut tab = fresh_tab();
        tab.transition_to(TabState::Navigating).unwrap();
        tab.record_loaded("https://a.example".into(), "A".into(), 0, NavigationKind::Fresh)
            .unwrap();

        assert_eq!(tab.state, TabState::Loaded);
        assert_eq!(tab.current_url, "https://a.example");
        assert_eq!(tab.history_len(), 1);
        assert!(tab.prior_entry().is_none());
    }

    #[test]
    fn test_fresh_load_after_back_discards_forward_entries() {
        let mut tab = fresh_tab();
        for (i, url) in ["https://a.example", "https://b.example"].iter().enumerate() {
            tab.transition_to(TabState::Navigating).unwrap();
            tab.record_loaded(url.to_string(), String::new(), i, NavigationKind::Fresh)
                .unwrap();
        }

        // Back to A (revisit appended at log index 2)
        tab.transition_to(TabState::Navigating).unwrap();
        tab.record_loaded("https://a.example".into(), String::new(), 2, NavigationKind::Back)
            .unwrap();
        assert!(tab.next_entry().is_some());

        // Fresh navigation from A discards the forward entry for B
        tab.transition_to(TabState::Navigating).unwrap();
        tab.record_loaded("https://c.example".into(), String::new(), 3, NavigationKind::Fresh)
            .unwrap();
        assert!(tab.next_entry().is_none());
        assert_eq!(tab.history_len(), 2);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut tab = fresh_tab();
        let err = tab.transition_to(TabState::Loaded).unwrap_err();
        assert!(matches!(err, TabError::InvalidTransition { .. }));
        assert_eq!(tab.state, TabState::Idle);
    }
}
