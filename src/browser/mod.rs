//! Browser collaborators
//!
//! Tab control and page scripting are reached only through the [`Browser`]
//! trait. The page side of page scripting lives in [`page`].

pub mod page;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use page::{Dom, ElementInfo, ElementSnapshot, OpenEmail, PageActionRunner, PageInfo};

/// Browser tab identifier
pub type TabId = i64;

/// Scroll offset used by voice scrolling, in pixels
pub const SCROLL_STEP_PX: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    Smooth,
    Auto,
}

/// A primitive action run inside a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageAction {
    ScrollBy { top: i32, behavior: ScrollBehavior },
    Click { selector: String },
    Type { selector: String, text: String },
    GetPageInfo,
    /// Visible text of the page body, truncated to `max_chars`
    ReadText { max_chars: usize },
    InspectElement { selector: String },
    /// The email currently open in Gmail
    ReadEmail,
}

/// What a page action produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PageOutcome {
    Done,
    PageInfo(PageInfo),
    Text(String),
    Element(ElementInfo),
    Email(OpenEmail),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrowserError {
    #[error("Tab {0} not found")]
    TabNotFound(TabId),
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Script execution failed: {0}")]
    ScriptFailed(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Unexpected page result for {0}")]
    UnexpectedOutcome(&'static str),
}

/// Tab control and page scripting
#[async_trait]
pub trait Browser: Send + Sync {
    /// Run a page action in the given tab and return its outcome.
    async fn execute_in_page(&self, tab: TabId, action: PageAction) -> Result<PageOutcome, BrowserError>;

    /// Point an existing tab at a URL.
    async fn navigate(&self, tab: TabId, url: &str) -> Result<(), BrowserError>;

    async fn go_back(&self, tab: TabId) -> Result<(), BrowserError>;

    async fn go_forward(&self, tab: TabId) -> Result<(), BrowserError>;

    async fn reload(&self, tab: TabId) -> Result<(), BrowserError>;

    /// Open a new tab, optionally at a URL.
    async fn create_tab(&self, url: Option<&str>) -> Result<TabId, BrowserError>;

    async fn close_tab(&self, tab: TabId) -> Result<(), BrowserError>;
}
