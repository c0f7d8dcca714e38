//! Extraction error types

use thiserror::Error;

use peregrine_engine::EngineError;
use peregrine_tabs::TabError;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Script evaluation failed: {0}")]
    ScriptEvaluation(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Tab error: {0}")]
    Tab(#[from] TabError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
