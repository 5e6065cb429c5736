use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder content returned when no response element could be located.
pub const EXTRACTION_FAILED_SENTINEL: &str = "Could not extract the response.";

/// How a prompt is put into the input element and sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStrategy {
    /// Assign the text to the input directly, then press Enter.
    #[default]
    PressEnter,
    /// Click the input, type the text as keystrokes, then press Enter.
    /// For inputs that ignore direct value assignment (contenteditable editors).
    ClickButton,
}

/// Describes how to drive one chat website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAdapter {
    pub id: String,
    pub navigate_url: String,
    pub input_selector: String,
    #[serde(default)]
    pub submit_strategy: SubmitStrategy,
    pub response_selector: String,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Clicked to send instead of pressing Enter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button_selector: Option<String>,
    /// Present while the site is still generating. When set, the settle step
    /// polls for it to disappear instead of sleeping the whole timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_selector: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_ready_timeout_ms() -> u64 {
    10000
}

fn default_response_timeout_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    500
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvalidAdapter {
    #[error("site adapter has an empty id")]
    EmptyId,
    #[error("site adapter '{id}': {field} must not be empty")]
    EmptyField { id: String, field: &'static str },
    #[error("site adapter '{id}': {field} must be greater than zero")]
    ZeroDuration { id: String, field: &'static str },
}

impl SiteAdapter {
    pub fn new(
        id: impl Into<String>,
        navigate_url: impl Into<String>,
        input_selector: impl Into<String>,
        submit_strategy: SubmitStrategy,
        response_selector: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            navigate_url: navigate_url.into(),
            input_selector: input_selector.into(),
            submit_strategy,
            response_selector: response_selector.into(),
            ready_timeout_ms: default_ready_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            submit_button_selector: None,
            busy_selector: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    pub fn with_timeouts(mut self, ready_timeout_ms: u64, response_timeout_ms: u64) -> Self {
        self.ready_timeout_ms = ready_timeout_ms;
        self.response_timeout_ms = response_timeout_ms;
        self
    }

    pub fn with_submit_button(mut self, selector: impl Into<String>) -> Self {
        self.submit_button_selector = Some(selector.into());
        self
    }

    pub fn with_busy_selector(mut self, selector: impl Into<String>, poll_interval_ms: u64) -> Self {
        self.busy_selector = Some(selector.into());
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks the invariants a registry row must hold.
    pub fn validate(&self) -> Result<(), InvalidAdapter> {
        if self.id.trim().is_empty() {
            return Err(InvalidAdapter::EmptyId);
        }
        let required = [
            ("navigate_url", &self.navigate_url),
            ("input_selector", &self.input_selector),
            ("response_selector", &self.response_selector),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(InvalidAdapter::EmptyField {
                    id: self.id.clone(),
                    field,
                });
            }
        }
        let durations = [
            ("ready_timeout_ms", self.ready_timeout_ms),
            ("response_timeout_ms", self.response_timeout_ms),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(InvalidAdapter::ZeroDuration {
                    id: self.id.clone(),
                    field,
                });
            }
        }
        if self.busy_selector.is_some() && self.poll_interval_ms == 0 {
            return Err(InvalidAdapter::ZeroDuration {
                id: self.id.clone(),
                field: "poll_interval_ms",
            });
        }
        Ok(())
    }
}
