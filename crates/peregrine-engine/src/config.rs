//! Engine launch configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run without a visible window.
    pub headless: bool,
    /// Explicit path to the browser executable; auto-detected when `None`.
    pub executable: Option<String>,
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
    /// Per-request timeout applied by the driver, in milliseconds.
    pub request_timeout_ms: u64,
    /// Extra command-line arguments passed to the browser process.
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            viewport_width: 1280,
            viewport_height: 800,
            request_timeout_ms: 30_000,
            extra_args: Vec::new(),
        }
    }
}
