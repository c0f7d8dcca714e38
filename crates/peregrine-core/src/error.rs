//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Engine error: {0}")]
    Engine(#[from] peregrine_engine::EngineError),

    #[error("Session error: {0}")]
    Session(#[from] peregrine_session::SessionError),

    #[error("Tab error: {0}")]
    Tab(#[from] peregrine_tabs::TabError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] peregrine_navigation::NavigationError),

    #[error("Extraction error: {0}")]
    Extract(#[from] peregrine_extract::ExtractError),
}
