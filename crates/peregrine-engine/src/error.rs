//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine is not available; initialize it first")]
    Unavailable,

    #[error("Engine launch failed: {0}")]
    LaunchFailed(String),

    #[error("Engine connection lost: {0}")]
    ConnectionLost(String),

    #[error("Unknown browsing context: {0}")]
    UnknownContext(String),

    #[error("Unknown page: {0}")]
    UnknownPage(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Screenshot capture failed: {0}")]
    Screenshot(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl EngineError {
    /// True when the error means the engine process or its connection is gone.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, EngineError::ConnectionLost(_))
    }
}
