use async_trait::async_trait;
pub use chatpilot_common::error::BackendError;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// Everything a backend needs to start a persistent browser context.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    /// Cookie/login store; survives process restarts.
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_bin: Option<PathBuf>,
}

/// The browser-automation collaborator.
///
/// One implementation drives exactly one browser context and one active page.
/// Selector arguments are CSS selectors.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch a persistent context bound to `options.profile_dir`, reusing an
    /// already open page if the context restored one.
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), BackendError>;

    /// Close the browser and release the profile.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Check if the backend has a usable page.
    async fn is_ready(&self) -> bool;

    /// Navigate the active page.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError>;

    /// Wait until an element matches `selector`.
    ///
    /// Must return `BackendError::Timeout` when the bound elapses, so callers
    /// never have to interpret error text.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BackendError>;

    /// Replace the content of the matched input with `text`.
    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BackendError>;

    /// Click the first matching element.
    async fn click(&mut self, selector: &str) -> Result<(), BackendError>;

    /// Type `text` as keystrokes into the first matching element.
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), BackendError>;

    /// Press a key on the focused element.
    async fn press_key(&mut self, key: &str) -> Result<(), BackendError>;

    /// Rendered text of every element matching `selector`, in document order.
    async fn query_texts(&mut self, selector: &str) -> Result<Vec<String>, BackendError>;

    /// Whether any element currently matches `selector`.
    async fn is_present(&mut self, selector: &str) -> Result<bool, BackendError> {
        Ok(!self.query_texts(selector).await?.is_empty())
    }
}
