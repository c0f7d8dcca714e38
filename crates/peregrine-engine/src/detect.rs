//! Browser executable detection

use std::path::PathBuf;

/// Known Chromium-based executable names, searched in order. All speak CDP.
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
    "microsoft-edge",
    "brave-browser",
];

/// Result of executable detection.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Path to the executable, when one was found.
    pub path: Option<PathBuf>,
    /// Actionable hint when nothing was found.
    pub install_hint: String,
}

impl DetectionResult {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

/// Locate a Chromium-based browser executable.
///
/// Checks, in order: an explicit configured path, the `CHROME` environment
/// variable, then known executable names on `PATH`.
pub fn detect_executable(configured: Option<&str>) -> DetectionResult {
    if let Some(path) = configured {
        let p = PathBuf::from(path);
        if p.exists() {
            return DetectionResult {
                path: Some(p),
                install_hint: String::new(),
            };
        }
    }

    if let Ok(path) = std::env::var("CHROME") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return DetectionResult {
                path: Some(p),
                install_hint: String::new(),
            };
        }
    }

    for name in CHROMIUM_EXECUTABLES {
        if let Ok(p) = which::which(name) {
            return DetectionResult {
                path: Some(p),
                install_hint: String::new(),
            };
        }
    }

    DetectionResult {
        path: None,
        install_hint: "No Chromium-based browser found. Install Chrome or Chromium, \
                       or point the CHROME environment variable at an executable."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_must_exist() {
        let result = detect_executable(Some("/nonexistent/browser/binary"));
        // Falls through to the other strategies rather than trusting the bad path.
        if let Some(path) = &result.path {
            assert_ne!(path, &PathBuf::from("/nonexistent/browser/binary"));
        }
    }

    #[test]
    fn test_missing_browser_has_hint() {
        let result = detect_executable(None);
        if !result.found() {
            assert!(!result.install_hint.is_empty());
        }
    }
}
