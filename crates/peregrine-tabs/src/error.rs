//! Tab error types

use thiserror::Error;

use peregrine_engine::EngineError;
use peregrine_session::SessionError;

#[derive(Error, Debug)]
pub enum TabError {
    #[error("Tab not found: {0}")]
    NotFound(String),

    #[error("Tab is busy navigating: {0}")]
    Busy(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
