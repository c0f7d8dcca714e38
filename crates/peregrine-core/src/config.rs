//! Service configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use peregrine_engine::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Engine launch settings.
    pub engine: EngineConfig,
    /// Bound on a navigation's load-completion wait.
    pub navigation_timeout_ms: u64,
    /// Bound on script evaluation.
    pub script_timeout_ms: u64,
    /// Bound on content retrieval and screenshot capture.
    pub capture_timeout_ms: u64,
    /// Bound on each engine close call during teardown.
    pub cleanup_timeout_ms: u64,
}

impl Config {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_millis(self.cleanup_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            navigation_timeout_ms: 30_000,
            script_timeout_ms: 10_000,
            capture_timeout_ms: 15_000,
            cleanup_timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = Config::default();
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(config.cleanup_timeout(), Duration::from_secs(5));
    }
}
