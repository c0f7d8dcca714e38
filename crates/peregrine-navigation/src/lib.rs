//! Peregrine Navigation
//!
//! Drives navigate/reload/back/forward against a tab and its state machine.
//! Back and forward are resolved from the owning session's navigation log
//! through the tab's chain, then issued as plain navigations, so the log
//! stays append-only and the state machine stays deterministic.

mod controller;
mod error;

pub use controller::{HistoryOutcome, NavigationController};
pub use error::NavigationError;

pub type Result<T> = std::result::Result<T, NavigationError>;
