//! Error taxonomy shared by the engine and the browser backends.
//!
//! `BackendError` is what a browser collaborator reports for a single call.
//! `DriverError` is the request-level classification the command channel
//! turns into an error response.

/// Failures reported by a browser backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    // ============================================================
    // Lifecycle Errors
    // ============================================================
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Not ready")]
    NotReady,

    #[error("Connection lost")]
    ConnectionLost,

    // ============================================================
    // Page Errors
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("No element matches selector: {selector}")]
    NotFound { selector: String },

    #[error("Timed out after {timeout_ms}ms waiting for: {selector}")]
    Timeout { selector: String, timeout_ms: u64 },

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("Other: {0}")]
    Other(String),
}

impl BackendError {
    /// True when the failure means "the element never showed up", as opposed
    /// to the page or the browser being unusable.
    pub fn is_wait_failure(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout { .. } | BackendError::NotFound { .. }
        )
    }
}

/// Request-level failures. Each maps to one wire error code.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("No browser session is open; send an init request first")]
    SessionNotOpen,

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Malformed request: {0}")]
    Parse(String),

    #[error("Browser could not be started: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Login required or timeout: {0}")]
    LoginOrTimeout(String),

    #[error("Prompt could not be submitted: {0}")]
    SubmitFailed(String),

    #[error("Browser error: {0}")]
    Browser(String),
}

impl DriverError {
    /// Short code carried in the `error` field of an error response.
    pub fn code(&self) -> &'static str {
        match self {
            DriverError::SessionNotOpen => "session_not_open",
            DriverError::UnknownSite(_) => "unknown_site",
            DriverError::Config(_) => "invalid_config",
            DriverError::InvalidRequest(_) => "invalid_request",
            DriverError::UnknownAction(_) => "unknown_action",
            DriverError::Parse(_) => "parse_error",
            DriverError::Launch(_) => "launch_failed",
            DriverError::Navigation(_) => "navigation_failed",
            DriverError::LoginOrTimeout(_) => "login_required_or_timeout",
            DriverError::SubmitFailed(_) => "submit_failed",
            DriverError::Browser(_) => "browser_error",
        }
    }

    /// Human readable summary, without the diagnostic detail.
    pub fn message(&self) -> &'static str {
        match self {
            DriverError::SessionNotOpen => "Session not open",
            DriverError::UnknownSite(_) => "Unknown site",
            DriverError::Config(_) => "Invalid configuration",
            DriverError::InvalidRequest(_) => "Invalid request",
            DriverError::UnknownAction(_) => "Unknown action",
            DriverError::Parse(_) => "Malformed request",
            DriverError::Launch(_) => "Browser launch failed",
            DriverError::Navigation(_) => "Navigation failed",
            DriverError::LoginOrTimeout(_) => "Login required or timeout",
            DriverError::SubmitFailed(_) => "Prompt submission failed",
            DriverError::Browser(_) => "Browser error",
        }
    }

    /// Diagnostic detail carried in the `details` field.
    pub fn detail(&self) -> String {
        match self {
            DriverError::SessionNotOpen => self.to_string(),
            DriverError::UnknownSite(detail)
            | DriverError::Config(detail)
            | DriverError::InvalidRequest(detail)
            | DriverError::UnknownAction(detail)
            | DriverError::Parse(detail)
            | DriverError::Launch(detail)
            | DriverError::Navigation(detail)
            | DriverError::LoginOrTimeout(detail)
            | DriverError::SubmitFailed(detail)
            | DriverError::Browser(detail) => detail.clone(),
        }
    }
}

impl From<BackendError> for DriverError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Launch(msg) => DriverError::Launch(msg),
            BackendError::NotReady => DriverError::SessionNotOpen,
            BackendError::Navigation(msg) => DriverError::Navigation(msg),
            e @ (BackendError::Timeout { .. } | BackendError::NotFound { .. }) => {
                DriverError::LoginOrTimeout(e.to_string())
            }
            other => DriverError::Browser(other.to_string()),
        }
    }
}
