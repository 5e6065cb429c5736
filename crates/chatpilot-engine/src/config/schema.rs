use crate::backend::LaunchOptions;
use chatpilot_common::site::SiteAdapter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name under the platform data root.
pub const APP_DIR_NAME: &str = "chatpilot";

/// Subdirectory holding the browser profile.
pub const PROFILE_SUBDIR: &str = "browser_data";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatpilotConfig {
    #[serde(default)]
    pub browser: BrowserSettings,
    /// Extra site rows. A row whose id matches a bundled site replaces it.
    #[serde(default)]
    pub sites: Vec<SiteAdapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// A fresh profile needs a visible window for the first manual login.
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default)]
    pub chrome_bin: Option<PathBuf>,
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            chrome_bin: None,
            profile_dir: None,
        }
    }
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

impl BrowserSettings {
    pub fn launch_options(&self, profile_dir: &Path) -> LaunchOptions {
        LaunchOptions {
            profile_dir: profile_dir.to_path_buf(),
            headless: self.headless,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            chrome_bin: self.chrome_bin.clone(),
        }
    }

    /// Profile directory precedence: command line, environment, config file,
    /// then the platform default.
    pub fn resolve_profile_dir(
        &self,
        cli: Option<PathBuf>,
        env: Option<PathBuf>,
    ) -> PathBuf {
        cli.or(env)
            .or_else(|| self.profile_dir.clone())
            .unwrap_or_else(default_profile_dir)
    }
}

/// `<data dir>/chatpilot/browser_data`, falling back to the home directory.
pub fn default_profile_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(PROFILE_SUBDIR)
}
