use super::schema::{APP_DIR_NAME, ChatpilotConfig};
use crate::registry::SiteRegistry;
use chatpilot_common::site::InvalidAdapter;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid site adapter: {0}")]
    InvalidSite(#[from] InvalidAdapter),
    #[error("Site '{0}' is listed more than once")]
    DuplicateSite(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `explicit` if given, otherwise fall back to the default lookup.
    pub async fn load(explicit: Option<&Path>) -> Result<ChatpilotConfig, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path).await,
            None => Self::load_default().await,
        }
    }

    /// Load from default locations:
    /// 1. ./chatpilot.yaml
    /// 2. ~/.chatpilot/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<ChatpilotConfig, ConfigError> {
        let local_config = PathBuf::from("./chatpilot.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(format!(".{}", APP_DIR_NAME)).join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(ChatpilotConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<ChatpilotConfig, ConfigError> {
        info!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let config: ChatpilotConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

impl ChatpilotConfig {
    /// Bundled sites with this config's rows layered on top.
    pub fn registry(&self) -> Result<SiteRegistry, ConfigError> {
        let mut seen = HashSet::new();
        let mut registry = SiteRegistry::builtin();
        for adapter in &self.sites {
            if !seen.insert(adapter.id.as_str()) {
                return Err(ConfigError::DuplicateSite(adapter.id.clone()));
            }
            if registry.register(adapter.clone())?.is_some() {
                info!("Config overrides bundled site '{}'", adapter.id);
            }
        }
        Ok(registry)
    }
}
