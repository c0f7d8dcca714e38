//! Tab navigation state machine
//!
//! ```text
//! Idle
//!   ↓ navigate
//! Navigating ──→ Loaded
//!   │               ↓ navigate
//!   └──→ Failed ──→ Navigating
//! ```
//!
//! There is no terminal state; a tab cycles between Navigating, Loaded and
//! Failed for its whole life.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    /// Fresh tab, never navigated.
    Idle,
    /// A navigation is in flight; the tab rejects further mutations.
    Navigating,
    /// The last navigation completed.
    Loaded,
    /// The last navigation timed out or errored.
    Failed,
}

impl TabState {
    /// Check if transition to another state is valid.
    pub fn can_transition_to(&self, target: TabState) -> bool {
        match (self, target) {
            // Any settled state can start a navigation
            (TabState::Idle, TabState::Navigating) => true,
            (TabState::Loaded, TabState::Navigating) => true,
            (TabState::Failed, TabState::Navigating) => true,
            // An in-flight navigation settles one way or the other
            (TabState::Navigating, TabState::Loaded) => true,
            (TabState::Navigating, TabState::Failed) => true,
            // Everything else, including Navigating -> Navigating, is invalid
            _ => false,
        }
    }

    /// True while a navigation is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, TabState::Navigating)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabState::Idle => "idle",
            TabState::Navigating => "navigating",
            TabState::Loaded => "loaded",
            TabState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TabState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(TabState::Idle.can_transition_to(TabState::Navigating));
        assert!(TabState::Loaded.can_transition_to(TabState::Navigating));
        assert!(TabState::Failed.can_transition_to(TabState::Navigating));
        assert!(TabState::Navigating.can_transition_to(TabState::Loaded));
        assert!(TabState::Navigating.can_transition_to(TabState::Failed));
    }

    #[test]
    fn test_invalid_transitions() {
        // A second navigation cannot start while one is in flight
        assert!(!TabState::Navigating.can_transition_to(TabState::Navigating));
        // A settled tab cannot jump straight to another settled state
        assert!(!TabState::Idle.can_transition_to(TabState::Loaded));
        assert!(!TabState::Loaded.can_transition_to(TabState::Failed));
        assert!(!TabState::Failed.can_transition_to(TabState::Loaded));
    }
}
