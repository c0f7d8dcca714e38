//! The engine boundary contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Capability set reported by the health endpoint.
pub const CAPABILITIES: &[&str] = &[
    "create_context",
    "close_context",
    "new_page",
    "close_page",
    "goto",
    "reload",
    "evaluate",
    "screenshot",
    "content",
];

/// Handle for an isolated browsing context (own cookies/storage).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub String);

/// Handle for a single navigable page inside a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub String);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a completed page load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLoad {
    /// URL the page settled on (may differ from the requested URL after redirects).
    pub url: String,
    /// Document title, empty when the page has none.
    pub title: String,
}

/// Contract every headless-browser driver satisfies.
///
/// All calls cross into an external process and may suspend; callers bound
/// them with their own timeouts. Drivers report a lost process via
/// [`EngineError::ConnectionLost`](crate::EngineError::ConnectionLost) so the
/// supervisor can withdraw the handle.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Create a fresh isolated browsing context.
    async fn create_context(&self) -> Result<ContextId>;

    /// Discard a context and every page still inside it.
    async fn close_context(&self, context: &ContextId) -> Result<()>;

    /// Open a new blank page inside a context.
    async fn new_page(&self, context: &ContextId) -> Result<PageId>;

    /// Close a single page.
    async fn close_page(&self, page: &PageId) -> Result<()>;

    /// Navigate a page and wait for the load to complete.
    async fn goto(&self, page: &PageId, url: &str) -> Result<PageLoad>;

    /// Reload the page's current document.
    async fn reload(&self, page: &PageId) -> Result<PageLoad>;

    /// Evaluate a script expression in the page, returning its JSON value.
    async fn evaluate(&self, page: &PageId, expression: &str) -> Result<serde_json::Value>;

    /// Capture a PNG screenshot of the page.
    async fn screenshot(&self, page: &PageId, full_page: bool) -> Result<Vec<u8>>;

    /// Retrieve the page's current HTML.
    async fn content(&self, page: &PageId) -> Result<String>;

    /// Terminate the engine process. Best effort; the handle is unusable after.
    async fn terminate(&self) -> Result<()>;
}
