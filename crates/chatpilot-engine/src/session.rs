//! Browser session lifecycle.
//!
//! The manager exclusively owns the backend. Callers get the active page
//! through [`SessionManager::page`], which fails while no session is open.

use crate::backend::{Backend, BackendError, NavigationResult};
use crate::config::BrowserSettings;
use chatpilot_common::error::DriverError;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Session {
    pub profile_dir: PathBuf,
    pub opened_at: Instant,
}

pub struct SessionManager<B: Backend> {
    backend: B,
    browser: BrowserSettings,
    session: Option<Session>,
}

impl<B: Backend> SessionManager<B> {
    pub fn new(backend: B, browser: BrowserSettings) -> Self {
        Self {
            backend,
            browser,
            session: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open the persistent profile at `profile_dir`.
    ///
    /// An already open, still responsive session is reused as is.
    pub async fn open(&mut self, profile_dir: &Path) -> Result<&Session, DriverError> {
        if self.session.is_some() {
            if self.backend.is_ready().await {
                info!("Session already open; reusing it");
                return self.session.as_ref().ok_or(DriverError::SessionNotOpen);
            }
            warn!("Browser is no longer responding; relaunching");
            self.session = None;
            if let Err(e) = self.backend.close().await {
                warn!("Error releasing unresponsive browser: {}", e);
            }
        }

        tokio::fs::create_dir_all(profile_dir).await.map_err(|e| {
            DriverError::Launch(format!(
                "cannot create profile directory {}: {}",
                profile_dir.display(),
                e
            ))
        })?;

        info!("Opening browser profile at {}", profile_dir.display());
        let options = self.browser.launch_options(profile_dir);
        self.backend.launch(&options).await.map_err(|e| match e {
            BackendError::Launch(msg) => DriverError::Launch(msg),
            other => DriverError::Launch(other.to_string()),
        })?;

        let session = self.session.insert(Session {
            profile_dir: profile_dir.to_path_buf(),
            opened_at: Instant::now(),
        });
        Ok(&*session)
    }

    /// The active page, or a precondition error when no session is open.
    pub fn page(&mut self) -> Result<&mut B, DriverError> {
        if self.session.is_none() {
            return Err(DriverError::SessionNotOpen);
        }
        Ok(&mut self.backend)
    }

    pub async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        let page = self.page()?;
        url::Url::parse(url)
            .map_err(|e| DriverError::Navigation(format!("invalid url '{}': {}", url, e)))?;

        let result = page.navigate(url).await;
        result.map_err(|e| self.note_failure(e))
    }

    /// Release the browser. A no-op when nothing is open.
    pub async fn close(&mut self) -> Result<(), DriverError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        info!(
            "Closing browser session ({} open for {:?})",
            session.profile_dir.display(),
            session.opened_at.elapsed()
        );
        self.backend.close().await.map_err(DriverError::from)
    }

    /// Drop the session if the browser stopped responding. Returns whether a
    /// session is still open.
    pub async fn check_alive(&mut self) -> bool {
        if self.session.is_some() && !self.backend.is_ready().await {
            warn!("Browser is no longer responding; session closed");
            self.session = None;
        }
        self.session.is_some()
    }

    /// Convert a backend failure, dropping the session if the browser is gone.
    pub fn note_failure(&mut self, err: BackendError) -> DriverError {
        if matches!(err, BackendError::ConnectionLost | BackendError::NotReady) {
            warn!("Browser connection lost; session closed");
            self.session = None;
        }
        DriverError::from(err)
    }
}
