//! Peregrine Tab Management
//!
//! A Tab is a single navigable page within a session. Each tab runs a small
//! state machine (Idle → Navigating → Loaded/Failed → Navigating → …) that
//! keeps concurrent mutations single-writer: whoever moved the tab into
//! Navigating owns it until the load settles.

mod error;
mod registry;
mod state;
mod tab;

pub use error::TabError;
pub use registry::{
    HistoryDirection, PendingHistoryNavigation, PendingNavigation, TabRegistry,
};
pub use state::TabState;
pub use tab::{NavigationKind, Tab, TabInfo};

pub type Result<T> = std::result::Result<T, TabError>;
