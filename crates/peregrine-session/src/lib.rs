//! Peregrine Session Management
//!
//! A Session is an isolated browsing context (its own cookies/storage)
//! grouping zero or more tabs, together with the append-only log of
//! completed navigations inside it. The registry here is the sole source of
//! truth for which sessions exist.

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{NavigationEvent, Session, SessionStatus};

pub type Result<T> = std::result::Result<T, SessionError>;
