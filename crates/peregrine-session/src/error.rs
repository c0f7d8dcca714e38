//! Session error types

use thiserror::Error;

use peregrine_engine::EngineError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
