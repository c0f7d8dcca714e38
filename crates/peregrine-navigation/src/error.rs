//! Navigation error types

use thiserror::Error;

use peregrine_engine::EngineError;
use peregrine_session::SessionError;
use peregrine_tabs::TabError;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Navigation timed out after {timeout_ms} ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Navigation failed: {0}")]
    Failed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Tab error: {0}")]
    Tab(#[from] TabError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
