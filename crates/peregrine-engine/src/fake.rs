//! Deterministic in-memory engine
//!
//! Stands in for the real browser process in tests and offline runs. Behavior
//! is scripted per call: navigations can be made to fail or stall, script
//! results can be stubbed, page closes can be refused. State lives entirely
//! in process, so assertions about contexts/pages are exact.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::engine::{ContextId, Engine, PageId, PageLoad};
use crate::error::EngineError;
use crate::supervisor::EngineLauncher;
use crate::Result;

/// PNG file signature; fake screenshots start with it so content sniffing works.
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

#[derive(Debug, Clone)]
struct FakePage {
    context: String,
    url: String,
    title: String,
}

#[derive(Default)]
struct FakeState {
    contexts: HashSet<String>,
    pages: HashMap<String, FakePage>,
    terminated: bool,
    connection_dropped: bool,
    // Scripted behavior
    failing_urls: HashMap<String, String>,
    goto_delay: Option<Duration>,
    eval_stubs: HashMap<String, std::result::Result<serde_json::Value, String>>,
    refuse_page_close: HashSet<String>,
    fail_screenshots: bool,
}

/// In-memory [`Engine`] with scriptable failures.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every `goto` to `url` fail with `message`.
    pub fn fail_goto(&self, url: &str, message: &str) {
        self.state
            .lock()
            .failing_urls
            .insert(url.to_string(), message.to_string());
    }

    /// Let `goto` to `url` succeed again.
    pub fn clear_goto_failure(&self, url: &str) {
        self.state.lock().failing_urls.remove(url);
    }

    /// Delay every `goto` by `delay` (for timeout tests).
    pub fn set_goto_delay(&self, delay: Duration) {
        self.state.lock().goto_delay = Some(delay);
    }

    /// Stub the result of evaluating `expression`.
    pub fn stub_eval(
        &self,
        expression: &str,
        result: std::result::Result<serde_json::Value, String>,
    ) {
        self.state
            .lock()
            .eval_stubs
            .insert(expression.to_string(), result);
    }

    /// Make `close_page` on this page id fail.
    pub fn refuse_page_close(&self, page: &PageId) {
        self.state.lock().refuse_page_close.insert(page.0.clone());
    }

    pub fn fail_screenshots(&self, fail: bool) {
        self.state.lock().fail_screenshots = fail;
    }

    /// Simulate a crashed process: every later call reports a lost connection.
    pub fn drop_connection(&self) {
        self.state.lock().connection_dropped = true;
    }

    pub fn context_count(&self) -> usize {
        self.state.lock().contexts.len()
    }

    pub fn page_count(&self) -> usize {
        self.state.lock().pages.len()
    }

    fn check_alive(state: &FakeState) -> Result<()> {
        if state.connection_dropped {
            return Err(EngineError::ConnectionLost("connection dropped".into()));
        }
        if state.terminated {
            return Err(EngineError::ConnectionLost("engine terminated".into()));
        }
        Ok(())
    }

    fn revive(&self) {
        let mut state = self.state.lock();
        state.terminated = false;
        state.connection_dropped = false;
    }
}

/// Evaluate trivial `a+b` integer expressions so arithmetic probes work
/// without stubbing.
fn builtin_eval(expression: &str) -> Option<serde_json::Value> {
    let (a, b) = expression.split_once('+')?;
    let a: i64 = a.trim().parse().ok()?;
    let b: i64 = b.trim().parse().ok()?;
    Some(serde_json::Value::from(a + b))
}

#[async_trait]
impl Engine for FakeEngine {
    async fn create_context(&self) -> Result<ContextId> {
        let mut state = self.state.lock();
        Self::check_alive(&state)?;
        let id = Uuid::new_v4().to_string();
        state.contexts.insert(id.clone());
        Ok(ContextId(id))
    }

    async fn close_context(&self, context: &ContextId) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_alive(&state)?;
        if !state.contexts.remove(&context.0) {
            return Err(EngineError::UnknownContext(context.0.clone()));
        }
        state.pages.retain(|_, page| page.context != context.0);
        Ok(())
    }

    async fn new_page(&self, context: &ContextId) -> Result<PageId> {
        let mut state = self.state.lock();
        Self::check_alive(&state)?;
        if !state.contexts.contains(&context.0) {
            return Err(EngineError::UnknownContext(context.0.clone()));
        }
        let id = Uuid::new_v4().to_string();
        state.pages.insert(
            id.clone(),
            FakePage {
                context: context.0.clone(),
                url: "about:blank".to_string(),
                title: String::new(),
            },
        );
        Ok(PageId(id))
    }

    async fn close_page(&self, page: &PageId) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_alive(&state)?;
        if state.refuse_page_close.contains(&page.0) {
            return Err(EngineError::Protocol(format!(
                "page {} refused to close",
                page.0
            )));
        }
        if state.pages.remove(&page.0).is_none() {
            return Err(EngineError::UnknownPage(page.0.clone()));
        }
        Ok(())
    }

    async fn goto(&self, page: &PageId, url: &str) -> Result<PageLoad> {
        let delay = {
            let state = self.state.lock();
            Self::check_alive(&state)?;
            if !state.pages.contains_key(&page.0) {
                return Err(EngineError::UnknownPage(page.0.clone()));
            }
            if let Some(message) = state.failing_urls.get(url) {
                return Err(EngineError::Navigation(message.clone()));
            }
            state.goto_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        Self::check_alive(&state)?;
        let entry = state
            .pages
            .get_mut(&page.0)
            .ok_or_else(|| EngineError::UnknownPage(page.0.clone()))?;
        entry.url = url.to_string();
        entry.title = format!("Page at {url}");
        Ok(PageLoad {
            url: entry.url.clone(),
            title: entry.title.clone(),
        })
    }

    async fn reload(&self, page: &PageId) -> Result<PageLoad> {
        let url = {
            let state = self.state.lock();
            Self::check_alive(&state)?;
            state
                .pages
                .get(&page.0)
                .map(|p| p.url.clone())
                .ok_or_else(|| EngineError::UnknownPage(page.0.clone()))?
        };
        self.goto(page, &url).await
    }

    async fn evaluate(&self, page: &PageId, expression: &str) -> Result<serde_json::Value> {
        let state = self.state.lock();
        Self::check_alive(&state)?;
        if !state.pages.contains_key(&page.0) {
            return Err(EngineError::UnknownPage(page.0.clone()));
        }

        if let Some(stub) = state.eval_stubs.get(expression) {
            return stub
                .clone()
                .map_err(EngineError::Script);
        }
        if expression.trim_start().starts_with("throw") {
            return Err(EngineError::Script(format!(
                "uncaught exception in: {expression}"
            )));
        }
        Ok(builtin_eval(expression).unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self, page: &PageId, full_page: bool) -> Result<Vec<u8>> {
        let state = self.state.lock();
        Self::check_alive(&state)?;
        if !state.pages.contains_key(&page.0) {
            return Err(EngineError::UnknownPage(page.0.clone()));
        }
        if state.fail_screenshots {
            return Err(EngineError::Screenshot("capture failed".into()));
        }
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend(std::iter::repeat(0u8).take(if full_page { 64 } else { 32 }));
        Ok(bytes)
    }

    async fn content(&self, page: &PageId) -> Result<String> {
        let state = self.state.lock();
        Self::check_alive(&state)?;
        let entry = state
            .pages
            .get(&page.0)
            .ok_or_else(|| EngineError::UnknownPage(page.0.clone()))?;
        Ok(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            entry.title, entry.url
        ))
    }

    async fn terminate(&self) -> Result<()> {
        self.state.lock().terminated = true;
        Ok(())
    }
}

/// Launcher handing out one shared [`FakeEngine`].
pub struct FakeLauncher {
    engine: Arc<FakeEngine>,
    fail_next: Mutex<Option<String>>,
    launches: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            engine: FakeEngine::new(),
            fail_next: Mutex::new(None),
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The engine every successful launch publishes, for scripting failures.
    pub fn engine(&self) -> Arc<FakeEngine> {
        Arc::clone(&self.engine)
    }

    /// Make the next launch attempt fail with `message`.
    pub fn fail_next_launch(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }

    pub fn launch_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.launches)
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(EngineError::LaunchFailed(message));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.engine.revive();
        Ok(self.engine.clone() as Arc<dyn Engine>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_and_page_lifecycle() {
        let engine = FakeEngine::new();
        let ctx = engine.create_context().await.unwrap();
        let page = engine.new_page(&ctx).await.unwrap();
        assert_eq!(engine.page_count(), 1);

        let load = engine.goto(&page, "https://example.com").await.unwrap();
        assert_eq!(load.url, "https://example.com");

        engine.close_context(&ctx).await.unwrap();
        assert_eq!(engine.context_count(), 0);
        // Closing the context discards its pages too.
        assert_eq!(engine.page_count(), 0);
    }

    #[tokio::test]
    async fn test_builtin_arithmetic_eval() {
        let engine = FakeEngine::new();
        let ctx = engine.create_context().await.unwrap();
        let page = engine.new_page(&ctx).await.unwrap();

        let value = engine.evaluate(&page, "1+1").await.unwrap();
        assert_eq!(value, serde_json::json!(2));
    }

    #[tokio::test]
    async fn test_throwing_expression_is_script_error() {
        let engine = FakeEngine::new();
        let ctx = engine.create_context().await.unwrap();
        let page = engine.new_page(&ctx).await.unwrap();

        let err = engine
            .evaluate(&page, "throw new Error('boom')")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Script(_)));
    }

    #[tokio::test]
    async fn test_dropped_connection_reports_loss() {
        let engine = FakeEngine::new();
        let ctx = engine.create_context().await.unwrap();
        engine.drop_connection();

        let err = engine.new_page(&ctx).await.unwrap_err();
        assert!(err.is_connection_lost());
    }
}
