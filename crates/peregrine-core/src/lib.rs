//! Peregrine Core
//!
//! Central coordination layer for the browser lifecycle manager. Request
//! handlers talk to [`BrowserService`]; everything underneath — engine
//! supervision, the session/tab registries, navigation, extraction,
//! teardown — is wired together here.

mod cleanup;
mod config;
mod error;
mod service;

pub use cleanup::{CleanupCoordinator, CleanupFailure, CleanupReport};
pub use config::Config;
pub use error::CoreError;
pub use service::{BrowserService, HealthReport};

// Re-export core components
pub use peregrine_engine::{
    ChromiumLauncher, ContextId, Engine, EngineConfig, EngineError, EngineLauncher,
    EngineSupervisor, PageId, PageLoad,
};
pub use peregrine_extract::{
    ContentExtractor, ContentSnapshot, ExtractError, SnapshotPayload, SnapshotStatus,
};
pub use peregrine_navigation::{HistoryOutcome, NavigationController, NavigationError};
pub use peregrine_session::{
    NavigationEvent, Session, SessionError, SessionRegistry, SessionStatus,
};
pub use peregrine_tabs::{Tab, TabError, TabInfo, TabRegistry, TabState};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
