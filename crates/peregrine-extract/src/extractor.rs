//! Content Extractor

use std::sync::Arc;
use std::time::Duration;

use peregrine_engine::{EngineError, EngineSupervisor};
use peregrine_tabs::TabRegistry;

use crate::error::ExtractError;
use crate::snapshot::ContentSnapshot;
use crate::Result;

pub struct ContentExtractor {
    supervisor: Arc<EngineSupervisor>,
    tabs: Arc<TabRegistry>,
    /// Bound on script evaluation.
    script_timeout: Duration,
    /// Bound on content retrieval and screenshot capture.
    capture_timeout: Duration,
}

impl ContentExtractor {
    pub fn new(
        supervisor: Arc<EngineSupervisor>,
        tabs: Arc<TabRegistry>,
        script_timeout: Duration,
        capture_timeout: Duration,
    ) -> Self {
        Self {
            supervisor,
            tabs,
            script_timeout,
            capture_timeout,
        }
    }

    /// Point-in-time HTML of a tab's current page.
    ///
    /// Engine retrieval trouble comes back as a snapshot with Error status;
    /// only a lost engine aborts the call.
    pub async fn get_content(&self, tab_id: &str) -> Result<ContentSnapshot> {
        let tab = self.tabs.get_tab(tab_id)?;
        let _ = self.tabs.touch(tab_id);
        let engine = self.supervisor.handle()?;

        match tokio::time::timeout(self.capture_timeout, engine.content(&tab.page)).await {
            Ok(Ok(html)) => Ok(ContentSnapshot::html(tab_id, html)),
            Ok(Err(e)) => {
                let e = self.supervisor.note_engine_error(e);
                if matches!(e, EngineError::Unavailable) {
                    return Err(e.into());
                }
                tracing::warn!(tab_id = %tab_id, error = %e, "Content retrieval failed");
                Ok(ContentSnapshot::error(tab_id, e.to_string()))
            }
            Err(_) => Ok(ContentSnapshot::error(
                tab_id,
                format!(
                    "content retrieval timed out after {} ms",
                    self.capture_timeout.as_millis()
                ),
            )),
        }
    }

    /// Evaluate a script expression in the tab's page.
    ///
    /// A throwing or invalid expression (or a timeout) is a structured
    /// ScriptEvaluation failure; the tab stays usable either way.
    pub async fn evaluate(&self, tab_id: &str, expression: &str) -> Result<serde_json::Value> {
        let tab = self.tabs.get_tab(tab_id)?;
        let _ = self.tabs.touch(tab_id);
        let engine = self.supervisor.handle()?;

        match tokio::time::timeout(
            self.script_timeout,
            engine.evaluate(&tab.page, expression),
        )
        .await
        {
            Ok(Ok(value)) => {
                tracing::debug!(tab_id = %tab_id, "Evaluated expression");
                Ok(value)
            }
            Ok(Err(EngineError::Script(message))) => {
                Err(ExtractError::ScriptEvaluation(message))
            }
            Ok(Err(e)) => Err(self.supervisor.note_engine_error(e).into()),
            Err(_) => Err(ExtractError::ScriptEvaluation(format!(
                "evaluation timed out after {} ms",
                self.script_timeout.as_millis()
            ))),
        }
    }

    /// Capture a PNG screenshot of the tab's page.
    pub async fn screenshot(&self, tab_id: &str, full_page: bool) -> Result<ContentSnapshot> {
        let tab = self.tabs.get_tab(tab_id)?;
        let _ = self.tabs.touch(tab_id);
        let engine = self.supervisor.handle()?;

        match tokio::time::timeout(
            self.capture_timeout,
            engine.screenshot(&tab.page, full_page),
        )
        .await
        {
            Ok(Ok(bytes)) => {
                tracing::debug!(tab_id = %tab_id, bytes = bytes.len(), full_page, "Captured screenshot");
                Ok(ContentSnapshot::image(tab_id, bytes))
            }
            Ok(Err(EngineError::Screenshot(message))) => {
                Err(ExtractError::ScreenshotFailed(message))
            }
            Ok(Err(e)) => {
                let e = self.supervisor.note_engine_error(e);
                if matches!(e, EngineError::Unavailable) {
                    return Err(e.into());
                }
                Err(ExtractError::ScreenshotFailed(e.to_string()))
            }
            Err(_) => Err(ExtractError::ScreenshotFailed(format!(
                "capture timed out after {} ms",
                self.capture_timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotPayload;
    use peregrine_engine::fake::{FakeEngine, FakeLauncher};
    use peregrine_session::SessionRegistry;
    use peregrine_tabs::{TabError, TabState};

    struct Fixture {
        engine: Arc<FakeEngine>,
        tabs: Arc<TabRegistry>,
        extractor: ContentExtractor,
        tab_id: String,
    }

    async fn fixture() -> Fixture {
        let launcher = FakeLauncher::new();
        let engine = launcher.engine();
        let supervisor = Arc::new(EngineSupervisor::new(Box::new(launcher)));
        supervisor.initialize().await.unwrap();
        let sessions = Arc::new(SessionRegistry::new(Arc::clone(&supervisor)));
        let tabs = Arc::new(TabRegistry::new(
            Arc::clone(&supervisor),
            Arc::clone(&sessions),
        ));
        let extractor = ContentExtractor::new(
            supervisor,
            Arc::clone(&tabs),
            Duration::from_millis(500),
            Duration::from_millis(500),
        );

        let session = sessions.create_session(None).await.unwrap();
        let tab = tabs.create_tab(&session.id).await.unwrap();
        Fixture {
            engine,
            tabs,
            extractor,
            tab_id: tab.id,
        }
    }

    #[tokio::test]
    async fn test_get_content_returns_html() {
        let fx = fixture().await;
        let snapshot = fx.extractor.get_content(&fx.tab_id).await.unwrap();
        assert!(snapshot.is_ok());
        assert!(matches!(snapshot.payload, SnapshotPayload::Html(_)));
    }

    #[tokio::test]
    async fn test_evaluate_arithmetic() {
        let fx = fixture().await;
        let value = fx.extractor.evaluate(&fx.tab_id, "1+1").await.unwrap();
        assert_eq!(value, serde_json::json!(2));
    }

    #[tokio::test]
    async fn test_evaluate_stubbed_expression() {
        let fx = fixture().await;
        fx.engine
            .stub_eval("document.title", Ok(serde_json::json!("Example Domain")));

        let value = fx
            .extractor
            .evaluate(&fx.tab_id, "document.title")
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!("Example Domain"));
    }

    #[tokio::test]
    async fn test_throwing_expression_keeps_tab_usable() {
        let fx = fixture().await;
        let err = fx
            .extractor
            .evaluate(&fx.tab_id, "throw new Error('boom')")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ScriptEvaluation(_)));

        // The failure did not disturb the tab's state machine.
        assert_eq!(fx.tabs.get_tab(&fx.tab_id).unwrap().state, TabState::Idle);
        let value = fx.extractor.evaluate(&fx.tab_id, "2+3").await.unwrap();
        assert_eq!(value, serde_json::json!(5));
    }

    #[tokio::test]
    async fn test_screenshot_is_png_with_data_uri() {
        let fx = fixture().await;
        let snapshot = fx.extractor.screenshot(&fx.tab_id, false).await.unwrap();
        let SnapshotPayload::Image { data, content_type } = &snapshot.payload else {
            panic!("expected image payload");
        };
        assert_eq!(content_type, "image/png");
        assert!(data.starts_with(&[0x89, b'P', b'N', b'G']));
        assert!(snapshot.data_uri().unwrap().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_screenshot_failure_is_structured() {
        let fx = fixture().await;
        fx.engine.fail_screenshots(true);
        let err = fx.extractor.screenshot(&fx.tab_id, true).await.unwrap_err();
        assert!(matches!(err, ExtractError::ScreenshotFailed(_)));
    }

    #[tokio::test]
    async fn test_unknown_tab_is_not_found() {
        let fx = fixture().await;
        let err = fx.extractor.get_content("missing").await.unwrap_err();
        assert!(matches!(err, ExtractError::Tab(TabError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_connection_loss_aborts_with_engine_error() {
        let fx = fixture().await;
        fx.engine.drop_connection();
        let err = fx.extractor.get_content(&fx.tab_id).await.unwrap_err();
        assert!(matches!(err, ExtractError::Engine(EngineError::Unavailable)));
    }
}
