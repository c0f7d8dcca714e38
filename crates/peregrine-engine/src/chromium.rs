//! Chromium driver
//!
//! Drives a Chromium-family browser over CDP. One launched process hosts
//! every browsing context; isolation between contexts comes from CDP browser
//! contexts (separate cookies/storage).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::detect;
use crate::engine::{ContextId, Engine, PageId, PageLoad};
use crate::error::EngineError;
use crate::supervisor::EngineLauncher;
use crate::Result;

/// Map a CDP-level failure, promoting dead-connection noise to `ConnectionLost`.
fn classify(err: impl std::fmt::Display, fallback: fn(String) -> EngineError) -> EngineError {
    let msg = err.to_string();
    if msg.contains("AlreadyClosed") || msg.contains("ConnectionClosed") {
        EngineError::ConnectionLost(msg)
    } else {
        fallback(msg)
    }
}

struct PageEntry {
    page: Page,
    context: String,
}

/// CDP-backed [`Engine`].
pub struct ChromiumEngine {
    browser: tokio::sync::Mutex<Browser>,
    /// CDP event pump; must stay alive for commands to complete.
    event_pump: Mutex<Option<JoinHandle<()>>>,
    contexts: RwLock<HashMap<String, BrowserContextId>>,
    pages: RwLock<HashMap<String, PageEntry>>,
}

impl ChromiumEngine {
    fn page(&self, id: &PageId) -> Result<Page> {
        self.pages
            .read()
            .get(&id.0)
            .map(|entry| entry.page.clone())
            .ok_or_else(|| EngineError::UnknownPage(id.0.clone()))
    }

    /// Wait for the load to settle and report where the page ended up.
    async fn settle(page: &Page) -> PageLoad {
        let _ = page.wait_for_navigation().await;
        let url = page.url().await.ok().flatten().unwrap_or_default();
        let title = page.get_title().await.ok().flatten().unwrap_or_default();
        PageLoad { url, title }
    }
}

#[async_trait]
impl Engine for ChromiumEngine {
    async fn create_context(&self) -> Result<ContextId> {
        let response = {
            let browser = self.browser.lock().await;
            browser
                .execute(CreateBrowserContextParams::default())
                .await
                .map_err(|e| classify(e, EngineError::Protocol))?
        };

        let cdp_id = response.result.browser_context_id.clone();
        let id = Uuid::new_v4().to_string();
        self.contexts.write().insert(id.clone(), cdp_id);

        tracing::debug!(context_id = %id, "Created browsing context");
        Ok(ContextId(id))
    }

    async fn close_context(&self, context: &ContextId) -> Result<()> {
        let cdp_id = self
            .contexts
            .write()
            .remove(&context.0)
            .ok_or_else(|| EngineError::UnknownContext(context.0.clone()))?;

        // Page handles inside the context are dead once it is disposed.
        self.pages
            .write()
            .retain(|_, entry| entry.context != context.0);

        let params = DisposeBrowserContextParams::builder()
            .browser_context_id(cdp_id)
            .build()
            .map_err(EngineError::Protocol)?;

        let browser = self.browser.lock().await;
        browser
            .execute(params)
            .await
            .map_err(|e| classify(e, EngineError::Protocol))?;

        tracing::debug!(context_id = %context, "Closed browsing context");
        Ok(())
    }

    async fn new_page(&self, context: &ContextId) -> Result<PageId> {
        let cdp_id = self
            .contexts
            .read()
            .get(&context.0)
            .cloned()
            .ok_or_else(|| EngineError::UnknownContext(context.0.clone()))?;

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(cdp_id)
            .build()
            .map_err(EngineError::Protocol)?;

        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page(params)
                .await
                .map_err(|e| classify(e, EngineError::Protocol))?
        };

        let id = Uuid::new_v4().to_string();
        self.pages.write().insert(
            id.clone(),
            PageEntry {
                page,
                context: context.0.clone(),
            },
        );

        tracing::debug!(page_id = %id, context_id = %context, "Opened page");
        Ok(PageId(id))
    }

    async fn close_page(&self, page: &PageId) -> Result<()> {
        let entry = self
            .pages
            .write()
            .remove(&page.0)
            .ok_or_else(|| EngineError::UnknownPage(page.0.clone()))?;

        entry
            .page
            .close()
            .await
            .map_err(|e| classify(e, EngineError::Protocol))?;

        tracing::debug!(page_id = %page, "Closed page");
        Ok(())
    }

    async fn goto(&self, page: &PageId, url: &str) -> Result<PageLoad> {
        let page = self.page(page)?;
        page.goto(url)
            .await
            .map_err(|e| classify(e, EngineError::Navigation))?;
        Ok(Self::settle(&page).await)
    }

    async fn reload(&self, page: &PageId) -> Result<PageLoad> {
        let page = self.page(page)?;
        page.reload()
            .await
            .map_err(|e| classify(e, EngineError::Navigation))?;
        Ok(Self::settle(&page).await)
    }

    async fn evaluate(&self, page: &PageId, expression: &str) -> Result<serde_json::Value> {
        let page = self.page(page)?;
        let value: serde_json::Value = page
            .evaluate(expression)
            .await
            .map_err(|e| classify(e, EngineError::Script))?
            .into_value()
            .map_err(|e| EngineError::Script(format!("{e:?}")))?;
        Ok(value)
    }

    async fn screenshot(&self, page: &PageId, full_page: bool) -> Result<Vec<u8>> {
        let page = self.page(page)?;
        page.screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(full_page)
                .build(),
        )
        .await
        .map_err(|e| classify(e, EngineError::Screenshot))
    }

    async fn content(&self, page: &PageId) -> Result<String> {
        let page = self.page(page)?;
        page.content()
            .await
            .map_err(|e| classify(e, EngineError::Protocol))
    }

    async fn terminate(&self) -> Result<()> {
        {
            let mut browser = self.browser.lock().await;
            // Needs the event pump alive, so bound it instead of trusting it.
            match tokio::time::timeout(Duration::from_secs(5), browser.close()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "Browser close reported an error"),
                Err(_) => tracing::warn!("Browser close timed out"),
            }
        }

        if let Some(pump) = self.event_pump.lock().take() {
            pump.abort();
        }

        tracing::info!("Chromium engine terminated");
        Ok(())
    }
}

/// Launches a Chromium-family process and wraps it in a [`ChromiumEngine`].
pub struct ChromiumLauncher {
    config: EngineConfig,
}

impl ChromiumLauncher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>> {
        let detection = detect::detect_executable(self.config.executable.as_deref());
        let Some(executable) = detection.path else {
            return Err(EngineError::LaunchFailed(detection.install_hint));
        };

        let mut builder = BrowserConfig::builder();
        if !self.config.headless {
            builder = builder.with_head();
        }
        builder = builder
            .chrome_executable(&executable)
            .viewport(Viewport {
                width: self.config.viewport_width,
                height: self.config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(Duration::from_millis(self.config.request_timeout_ms));

        for arg in &self.config.extra_args {
            builder = builder.arg(arg);
        }
        builder = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox");

        let config = builder
            .build()
            .map_err(EngineError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| EngineError::LaunchFailed(e.to_string()))?;

        let event_pump = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                tracing::trace!(?event, "Engine event");
            }
            tracing::debug!("Engine event pump exited");
        });

        tracing::info!(executable = %executable.display(), "Launched Chromium engine");

        Ok(Arc::new(ChromiumEngine {
            browser: tokio::sync::Mutex::new(browser),
            event_pump: Mutex::new(Some(event_pump)),
            contexts: RwLock::new(HashMap::new()),
            pages: RwLock::new(HashMap::new()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_promotes_dead_connections() {
        let err = classify("Tried to send on AlreadyClosed channel", EngineError::Navigation);
        assert!(err.is_connection_lost());

        let err = classify("net::ERR_NAME_NOT_RESOLVED", EngineError::Navigation);
        assert!(matches!(err, EngineError::Navigation(_)));
    }
}
