//! Submit, wait and extract against the active page.
//!
//! One algorithm for every site; the [`SiteAdapter`] supplies the URL,
//! selectors and timings.

use crate::backend::{Backend, BackendError};
use chatpilot_common::error::DriverError;
use chatpilot_common::site::{EXTRACTION_FAILED_SENTINEL, SiteAdapter, SubmitStrategy};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

const SUBMIT_KEY: &str = "Enter";

/// What a finished interaction produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// The chat page is ready and no prompt was given.
    Opened { site_id: String },
    /// The prompt was sent; `content` is the last reply, or the
    /// extraction-failed sentinel.
    Answered { content: String },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InteractionEngine;

impl InteractionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run the chat protocol for `adapter` on `page`.
    ///
    /// Navigation and input-wait failures abort with an error. Once the prompt
    /// is sent, failing to read the reply degrades to the sentinel content.
    pub async fn interact<B: Backend + ?Sized>(
        &self,
        page: &mut B,
        adapter: &SiteAdapter,
        prompt: Option<&str>,
    ) -> Result<Interaction, DriverError> {
        info!("Opening {} at {}", adapter.id, adapter.navigate_url);
        page.navigate(&adapter.navigate_url)
            .await
            .map_err(DriverError::from)?;

        page.wait_for_selector(&adapter.input_selector, adapter.ready_timeout())
            .await
            .map_err(|e| classify_ready_failure(adapter, e))?;

        let Some(prompt) = prompt else {
            return Ok(Interaction::Opened {
                site_id: adapter.id.clone(),
            });
        };

        debug!("Submitting prompt ({} chars) to {}", prompt.chars().count(), adapter.id);
        self.submit(page, adapter, prompt)
            .await
            .map_err(|e| DriverError::SubmitFailed(e.to_string()))?;

        self.settle(page, adapter).await;

        Ok(Interaction::Answered {
            content: self.extract(page, adapter).await,
        })
    }

    async fn submit<B: Backend + ?Sized>(
        &self,
        page: &mut B,
        adapter: &SiteAdapter,
        prompt: &str,
    ) -> Result<(), BackendError> {
        match adapter.submit_strategy {
            SubmitStrategy::PressEnter => page.fill(&adapter.input_selector, prompt).await?,
            SubmitStrategy::ClickButton => {
                page.click(&adapter.input_selector).await?;
                page.type_text(&adapter.input_selector, prompt).await?;
            }
        }

        match &adapter.submit_button_selector {
            Some(button) => page.click(button).await,
            None => page.press_key(SUBMIT_KEY).await,
        }
    }

    /// Give the site time to produce its reply.
    ///
    /// Without a busy indicator this is a flat delay of `response_timeout_ms`.
    /// With one, the indicator is re-checked every `poll_interval_ms` until it
    /// disappears or the timeout is reached.
    async fn settle<B: Backend + ?Sized>(&self, page: &mut B, adapter: &SiteAdapter) {
        let Some(busy) = &adapter.busy_selector else {
            sleep(adapter.response_timeout()).await;
            return;
        };

        let deadline = Instant::now() + adapter.response_timeout();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("{} still generating at the response timeout", adapter.id);
                return;
            }
            sleep(adapter.poll_interval().min(remaining)).await;

            match page.is_present(busy).await {
                Ok(true) => continue,
                Ok(false) => {
                    debug!("{} finished generating", adapter.id);
                    return;
                }
                Err(e) => {
                    warn!("Busy indicator check failed for {}: {}", adapter.id, e);
                    return;
                }
            }
        }
    }

    async fn extract<B: Backend + ?Sized>(&self, page: &mut B, adapter: &SiteAdapter) -> String {
        match page.query_texts(&adapter.response_selector).await {
            Ok(texts) => match texts.into_iter().last() {
                Some(content) => content,
                None => {
                    warn!(
                        "No element matched {} on {}",
                        adapter.response_selector, adapter.id
                    );
                    EXTRACTION_FAILED_SENTINEL.to_string()
                }
            },
            Err(e) => {
                warn!("Reading the reply from {} failed: {}", adapter.id, e);
                EXTRACTION_FAILED_SENTINEL.to_string()
            }
        }
    }
}

fn classify_ready_failure(adapter: &SiteAdapter, err: BackendError) -> DriverError {
    if err.is_wait_failure() {
        DriverError::LoginOrTimeout(format!(
            "{} did not show {} within {}ms; log in through the browser window if needed",
            adapter.id,
            adapter.input_selector,
            adapter.ready_timeout_ms
        ))
    } else {
        DriverError::from(err)
    }
}

