//! Engine supervision
//!
//! One supervisor owns the one engine process. Everybody else borrows the
//! handle through [`EngineSupervisor::handle`] and never launches or kills
//! the process themselves.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::Result;

/// Strategy for bringing an engine process up.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Engine>>;
}

pub struct EngineSupervisor {
    launcher: Box<dyn EngineLauncher>,
    /// Serializes launch/terminate across their suspension points.
    lifecycle: Mutex<()>,
    /// Published handle; `None` until initialized, and again after a loss.
    active: RwLock<Option<Arc<dyn Engine>>>,
}

impl EngineSupervisor {
    pub fn new(launcher: Box<dyn EngineLauncher>) -> Self {
        Self {
            launcher,
            lifecycle: Mutex::new(()),
            active: RwLock::new(None),
        }
    }

    /// Launch the engine if it is not already running.
    ///
    /// Idempotent: concurrent callers serialize here and observe a single
    /// launch. On failure no handle is published, so a later retry starts
    /// from a clean slate.
    pub async fn initialize(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.active.read().is_some() {
            tracing::debug!("Engine already initialized");
            return Ok(());
        }

        let engine = self.launcher.launch().await?;
        *self.active.write() = Some(engine);

        tracing::info!("Engine initialized");
        Ok(())
    }

    /// The shared engine handle, or `Unavailable` before initialization.
    pub fn handle(&self) -> Result<Arc<dyn Engine>> {
        self.active.read().clone().ok_or(EngineError::Unavailable)
    }

    pub fn is_ready(&self) -> bool {
        self.active.read().is_some()
    }

    /// Record an engine error observed by a component.
    ///
    /// A lost connection withdraws the handle, so every later call fails
    /// with `Unavailable` until an explicit `initialize()`. Other errors
    /// pass through unchanged.
    pub fn note_engine_error(&self, err: EngineError) -> EngineError {
        if err.is_connection_lost() {
            tracing::warn!(error = %err, "Engine connection lost; handle withdrawn");
            *self.active.write() = None;
            EngineError::Unavailable
        } else {
            err
        }
    }

    /// Terminate the engine process, best effort.
    pub async fn terminate(&self) {
        let _lifecycle = self.lifecycle.lock().await;

        let engine = self.active.write().take();
        if let Some(engine) = engine {
            if let Err(e) = engine.terminate().await {
                tracing::warn!(error = %e, "Engine termination reported an error");
            }
            tracing::info!("Engine terminated");
        }
    }
}
