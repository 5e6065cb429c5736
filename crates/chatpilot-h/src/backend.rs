use crate::cdp::CdpClient;
use crate::script;
use async_trait::async_trait;
use chatpilot_engine::backend::{Backend, BackendError, LaunchOptions, NavigationResult};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// How often `wait_for_selector` re-checks the page.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bound on a single JavaScript evaluation, so a blocked page cannot hang a request.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Chromium over the DevTools protocol, bound to one persistent profile.
pub struct HeadlessBackend {
    client: Option<CdpClient>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self { client: None }
    }

    fn page(&self) -> Result<&Page, BackendError> {
        match &self.client {
            Some(client) if client.is_alive() => Ok(&client.page),
            Some(_) => Err(BackendError::ConnectionLost),
            None => Err(BackendError::NotReady),
        }
    }

    async fn get_navigation_result(page: &Page) -> Result<NavigationResult, BackendError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(
        page: &Page,
        expression: String,
    ) -> Result<T, BackendError> {
        tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression))
            .await
            .map_err(|_| BackendError::Timeout {
                selector: "script evaluation".to_string(),
                timeout_ms: EVAL_TIMEOUT.as_millis() as u64,
            })?
            .map_err(|e| BackendError::ScriptError(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| BackendError::ScriptError(e.to_string()))
    }

    async fn dispatch_key(
        page: &Page,
        kind: DispatchKeyEventType,
        key: &str,
    ) -> Result<(), BackendError> {
        let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key).code(key);
        // Enter only submits when the event carries its text
        if key == "Enter" {
            builder = builder
                .text("\r")
                .windows_virtual_key_code(13)
                .native_virtual_key_code(13);
        }
        let params = builder
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build key event: {:?}", e)))?;
        page.execute(params)
            .await
            .map_err(|e| BackendError::Other(format!("press_key failed: {}", e)))?;
        Ok(())
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), BackendError> {
        info!("Launching Chromium on profile {}", options.profile_dir.display());
        let client = CdpClient::launch(options)
            .await
            .map_err(|e| BackendError::Launch(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.as_ref().is_some_and(CdpClient::is_alive)
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let page = self.page()?;

        info!("Navigating to: {}", url);
        page.goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        Self::get_navigation_result(page).await
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BackendError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;

        loop {
            match Self::evaluate::<bool>(page, script::presence(selector)).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                // The page may still be swapping documents
                Err(BackendError::ScriptError(e)) if script::is_context_error(&e) => {
                    debug!("Context unavailable while waiting for {}: {}", selector, e);
                }
                Err(BackendError::ScriptError(e)) => {
                    return Err(BackendError::SelectorInvalid {
                        selector: format!("{} ({})", selector, e),
                    });
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(BackendError::Timeout {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BackendError> {
        let page = self.page()?;
        let filled: bool = Self::evaluate(page, script::fill(selector, text)).await?;
        if !filled {
            return Err(BackendError::NotFound {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), BackendError> {
        let page = self.page()?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|_| BackendError::NotFound {
                selector: selector.to_string(),
            })?;
        element
            .click()
            .await
            .map_err(|e| BackendError::Other(format!("click failed: {}", e)))?;
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), BackendError> {
        let page = self.page()?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|_| BackendError::NotFound {
                selector: selector.to_string(),
            })?;
        element
            .focus()
            .await
            .map_err(|e| BackendError::Other(format!("focus failed: {}", e)))?;
        element
            .type_str(text)
            .await
            .map_err(|e| BackendError::Other(format!("typing failed: {}", e)))?;
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> Result<(), BackendError> {
        let page = self.page()?;
        Self::dispatch_key(page, DispatchKeyEventType::KeyDown, key).await?;
        Self::dispatch_key(page, DispatchKeyEventType::KeyUp, key).await
    }

    async fn query_texts(&mut self, selector: &str) -> Result<Vec<String>, BackendError> {
        let page = self.page()?;
        let texts: Vec<Value> = Self::evaluate(page, script::texts(selector)).await?;
        Ok(texts
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool, BackendError> {
        let page = self.page()?;
        Self::evaluate(page, script::presence(selector)).await
    }
}
