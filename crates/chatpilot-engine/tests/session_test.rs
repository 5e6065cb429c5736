mod common;

use chatpilot_engine::backend::BackendError;
use chatpilot_engine::config::BrowserSettings;
use chatpilot_engine::error::DriverError;
use chatpilot_engine::session::SessionManager;
use common::ScriptedBackend;

fn manager(backend: ScriptedBackend) -> SessionManager<ScriptedBackend> {
    SessionManager::new(backend, BrowserSettings::default())
}

#[tokio::test]
async fn test_open_creates_profile_dir_and_launches() {
    let temp = tempfile::tempdir().unwrap();
    let profile = temp.path().join("nested").join("browser_data");
    let mut sessions = manager(ScriptedBackend::new());

    let session = sessions.open(&profile).await.unwrap();
    assert_eq!(session.profile_dir, profile);
    assert!(profile.is_dir());
    assert!(sessions.is_open());

    let launch = sessions.backend().last_launch.clone().unwrap();
    assert_eq!(launch.profile_dir, profile);
    assert!(!launch.headless);
    assert_eq!((launch.viewport_width, launch.viewport_height), (1280, 720));
}

#[tokio::test]
async fn test_open_twice_reuses_browser() {
    let temp = tempfile::tempdir().unwrap();
    let mut sessions = manager(ScriptedBackend::new());

    sessions.open(temp.path()).await.unwrap();
    sessions.open(temp.path()).await.unwrap();

    assert_eq!(sessions.backend().launches, 1);
    assert_eq!(sessions.backend().closes, 0);
}

#[tokio::test]
async fn test_launch_failure_leaves_session_closed() {
    let temp = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend::new();
    backend.launch_error = Some(BackendError::Launch("profile is locked".into()));
    let mut sessions = manager(backend);

    let err = sessions.open(temp.path()).await.unwrap_err();
    assert_eq!(err.code(), "launch_failed");
    assert!(err.detail().contains("locked"));
    assert!(!sessions.is_open());
}

#[tokio::test]
async fn test_navigate_requires_open_session() {
    let mut sessions = manager(ScriptedBackend::new());
    let err = sessions.navigate("https://example.com").await.unwrap_err();
    assert_eq!(err, DriverError::SessionNotOpen);
    assert!(sessions.page().is_err());
}

#[tokio::test]
async fn test_navigate_rejects_invalid_url() {
    let temp = tempfile::tempdir().unwrap();
    let mut sessions = manager(ScriptedBackend::new());
    sessions.open(temp.path()).await.unwrap();

    let err = sessions.navigate("not a url").await.unwrap_err();
    assert_eq!(err.code(), "navigation_failed");
    assert!(!sessions.backend().called("navigate"));
}

#[tokio::test]
async fn test_navigate_reports_landing_page() {
    let temp = tempfile::tempdir().unwrap();
    let mut sessions = manager(ScriptedBackend::new());
    sessions.open(temp.path()).await.unwrap();

    let result = sessions.navigate("https://example.com").await.unwrap();
    assert_eq!(result.url, "https://example.com");
    assert_eq!(
        sessions.backend().current_url.as_deref(),
        Some("https://example.com")
    );
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let mut sessions = manager(ScriptedBackend::new());

    sessions.close().await.unwrap();
    assert_eq!(sessions.backend().closes, 0);

    sessions.open(temp.path()).await.unwrap();
    sessions.close().await.unwrap();
    sessions.close().await.unwrap();
    assert_eq!(sessions.backend().closes, 1);
    assert!(!sessions.is_open());
    assert_eq!(sessions.page().unwrap_err(), DriverError::SessionNotOpen);
}

#[tokio::test]
async fn test_lost_connection_closes_session() {
    let temp = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend::new();
    backend.navigation_error = Some(BackendError::ConnectionLost);
    let mut sessions = manager(backend);
    sessions.open(temp.path()).await.unwrap();

    let err = sessions.navigate("https://example.com").await.unwrap_err();
    assert_eq!(err.code(), "browser_error");
    assert!(!sessions.is_open());
}
