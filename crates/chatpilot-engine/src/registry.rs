//! Site adapter registry.
//!
//! Sites differ only in data: where to go, what to type into, what to read
//! back. One row per site, looked up by id.

use chatpilot_common::error::DriverError;
use chatpilot_common::site::{InvalidAdapter, SiteAdapter, SubmitStrategy};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    adapters: HashMap<String, SiteAdapter>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bundled chat sites.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for adapter in builtin_adapters() {
            registry.adapters.insert(adapter.id.clone(), adapter);
        }
        registry
    }

    /// Insert or replace a row. Returns the row it replaced, if any.
    pub fn register(&mut self, adapter: SiteAdapter) -> Result<Option<SiteAdapter>, InvalidAdapter> {
        adapter.validate()?;
        debug!("Registering site adapter '{}'", adapter.id);
        Ok(self.adapters.insert(adapter.id.clone(), adapter))
    }

    pub fn resolve(&self, site_id: &str) -> Result<&SiteAdapter, DriverError> {
        self.adapters.get(site_id).ok_or_else(|| {
            DriverError::UnknownSite(format!(
                "'{}' is not registered (known: {})",
                site_id,
                self.ids().join(", ")
            ))
        })
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

fn builtin_adapters() -> Vec<SiteAdapter> {
    vec![
        SiteAdapter::new(
            "chatgpt",
            "https://chat.openai.com",
            "#prompt-textarea",
            SubmitStrategy::PressEnter,
            r#"[data-message-author-role="assistant"]"#,
        ),
        SiteAdapter::new(
            "deepseek",
            "https://chat.deepseek.com",
            "textarea#chat-input",
            SubmitStrategy::PressEnter,
            ".ds-markdown",
        ),
        SiteAdapter::new(
            "glm",
            "https://chatglm.cn",
            "textarea",
            SubmitStrategy::PressEnter,
            ".markdown-body",
        ),
        // The Kimi editor is contenteditable and ignores value assignment.
        SiteAdapter::new(
            "kimi",
            "https://kimi.moonshot.cn",
            ".chat-input-editor",
            SubmitStrategy::ClickButton,
            ".markdown",
        ),
    ]
}
