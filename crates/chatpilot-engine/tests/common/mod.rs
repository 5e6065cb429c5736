#![allow(dead_code)]

use async_trait::async_trait;
use chatpilot_engine::backend::{Backend, BackendError, LaunchOptions, NavigationResult};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// In-memory page: selectors either match a list of texts or never appear.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    pub ready: bool,
    pub launches: usize,
    pub closes: usize,
    pub last_launch: Option<LaunchOptions>,
    pub current_url: Option<String>,
    /// Every page call, in order, as "op:arg".
    pub calls: Vec<String>,
    pub launch_error: Option<BackendError>,
    pub navigation_error: Option<BackendError>,
    pub submit_error: Option<BackendError>,
    pub query_error: Option<BackendError>,
    /// Selectors `wait_for_selector` times out on.
    pub never_appears: HashSet<String>,
    pub texts: HashMap<String, Vec<String>>,
    /// How many more `is_present` checks report the busy selector.
    pub busy_polls: HashMap<String, usize>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texts(mut self, selector: &str, texts: &[&str]) -> Self {
        self.texts.insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn never_showing(mut self, selector: &str) -> Self {
        self.never_appears.insert(selector.to_string());
        self
    }

    pub fn busy_for(mut self, selector: &str, polls: usize) -> Self {
        self.busy_polls.insert(selector.to_string(), polls);
        self
    }

    pub fn called(&self, op: &str) -> bool {
        self.calls.iter().any(|c| c.starts_with(&format!("{}:", op)))
    }

    pub fn ops(&self) -> Vec<&str> {
        self.calls
            .iter()
            .map(|c| c.split(':').next().unwrap_or(""))
            .collect()
    }

    fn record(&mut self, op: &str, arg: &str) {
        self.calls.push(format!("{}:{}", op, arg));
    }

    fn ensure_ready(&self) -> Result<(), BackendError> {
        if self.ready {
            Ok(())
        } else {
            Err(BackendError::NotReady)
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), BackendError> {
        if let Some(err) = self.launch_error.clone() {
            return Err(err);
        }
        self.launches += 1;
        self.ready = true;
        self.last_launch = Some(options.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.closes += 1;
        self.ready = false;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.ready
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        self.ensure_ready()?;
        self.record("navigate", url);
        if let Some(err) = self.navigation_error.clone() {
            return Err(err);
        }
        self.current_url = Some(url.to_string());
        Ok(NavigationResult {
            url: url.to_string(),
            title: "Scripted".to_string(),
        })
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BackendError> {
        self.ensure_ready()?;
        self.record("wait", selector);
        if self.never_appears.contains(selector) {
            return Err(BackendError::Timeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BackendError> {
        self.ensure_ready()?;
        self.record("fill", &format!("{}={}", selector, text));
        match self.submit_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), BackendError> {
        self.ensure_ready()?;
        self.record("click", selector);
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), BackendError> {
        self.ensure_ready()?;
        self.record("type", &format!("{}={}", selector, text));
        match self.submit_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn press_key(&mut self, key: &str) -> Result<(), BackendError> {
        self.ensure_ready()?;
        self.record("press", key);
        Ok(())
    }

    async fn query_texts(&mut self, selector: &str) -> Result<Vec<String>, BackendError> {
        self.ensure_ready()?;
        self.record("query", selector);
        if let Some(err) = self.query_error.clone() {
            return Err(err);
        }
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool, BackendError> {
        self.ensure_ready()?;
        self.record("present", selector);
        match self.busy_polls.get_mut(selector) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
