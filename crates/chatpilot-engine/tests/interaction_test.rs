mod common;

use chatpilot_engine::backend::{Backend, BackendError, LaunchOptions};
use chatpilot_engine::interaction::{Interaction, InteractionEngine};
use chatpilot_engine::site::{EXTRACTION_FAILED_SENTINEL, SiteAdapter, SubmitStrategy};
use common::ScriptedBackend;
use std::path::PathBuf;
use tokio::time::{Duration, Instant};

fn adapter(strategy: SubmitStrategy) -> SiteAdapter {
    SiteAdapter::new(
        "demo",
        "https://chat.example.com",
        "#prompt",
        strategy,
        ".reply",
    )
}

async fn launched(backend: ScriptedBackend) -> ScriptedBackend {
    let mut backend = backend;
    backend
        .launch(&LaunchOptions {
            profile_dir: PathBuf::from("/tmp/unused"),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chrome_bin: None,
        })
        .await
        .unwrap();
    backend
}

#[tokio::test(start_paused = true)]
async fn test_answer_is_last_matching_element() {
    let mut page = launched(ScriptedBackend::new().with_texts(".reply", &["first", "hi"])).await;
    let engine = InteractionEngine::new();

    let result = engine
        .interact(&mut page, &adapter(SubmitStrategy::PressEnter), Some("hello"))
        .await
        .unwrap();

    assert_eq!(
        result,
        Interaction::Answered {
            content: "hi".into()
        }
    );
    assert_eq!(
        page.ops(),
        vec!["navigate", "wait", "fill", "press", "query"]
    );
    assert!(page.calls.contains(&"fill:#prompt=hello".to_string()));
    assert!(page.calls.contains(&"press:Enter".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_no_match_yields_sentinel() {
    let mut page = launched(ScriptedBackend::new()).await;
    let engine = InteractionEngine::new();

    let result = engine
        .interact(&mut page, &adapter(SubmitStrategy::PressEnter), Some("hello"))
        .await
        .unwrap();

    assert_eq!(
        result,
        Interaction::Answered {
            content: EXTRACTION_FAILED_SENTINEL.into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_query_failure_yields_sentinel() {
    let mut backend = ScriptedBackend::new();
    backend.query_error = Some(BackendError::ScriptError("detached".into()));
    let mut page = launched(backend).await;

    let result = InteractionEngine::new()
        .interact(&mut page, &adapter(SubmitStrategy::PressEnter), Some("hello"))
        .await
        .unwrap();

    assert_eq!(
        result,
        Interaction::Answered {
            content: EXTRACTION_FAILED_SENTINEL.into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_without_prompt_only_opens() {
    let mut page = launched(ScriptedBackend::new()).await;

    let result = InteractionEngine::new()
        .interact(&mut page, &adapter(SubmitStrategy::PressEnter), None)
        .await
        .unwrap();

    assert_eq!(
        result,
        Interaction::Opened {
            site_id: "demo".into()
        }
    );
    assert_eq!(page.ops(), vec!["navigate", "wait"]);
}

#[tokio::test(start_paused = true)]
async fn test_ready_timeout_is_login_or_timeout() {
    let mut page = launched(ScriptedBackend::new().never_showing("#prompt")).await;

    let err = InteractionEngine::new()
        .interact(&mut page, &adapter(SubmitStrategy::PressEnter), Some("hello"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "login_required_or_timeout");
    assert!(err.detail().contains("10000ms"));
    assert!(!page.called("fill"));
}

#[tokio::test(start_paused = true)]
async fn test_navigation_failure_aborts() {
    let mut backend = ScriptedBackend::new();
    backend.navigation_error = Some(BackendError::Navigation("net::ERR_INTERNET_DISCONNECTED".into()));
    let mut page = launched(backend).await;

    let err = InteractionEngine::new()
        .interact(&mut page, &adapter(SubmitStrategy::PressEnter), Some("hello"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "navigation_failed");
    assert!(!page.called("wait"));
}

#[tokio::test(start_paused = true)]
async fn test_click_strategy_types_keystrokes() {
    let mut page = launched(ScriptedBackend::new().with_texts(".reply", &["ok"])).await;

    InteractionEngine::new()
        .interact(&mut page, &adapter(SubmitStrategy::ClickButton), Some("hola"))
        .await
        .unwrap();

    assert_eq!(
        page.ops(),
        vec!["navigate", "wait", "click", "type", "press", "query"]
    );
    assert!(page.calls.contains(&"type:#prompt=hola".to_string()));
    assert!(!page.called("fill"));
}

#[tokio::test(start_paused = true)]
async fn test_submit_button_replaces_enter() {
    let mut page = launched(ScriptedBackend::new()).await;
    let site = adapter(SubmitStrategy::PressEnter).with_submit_button("button.send");

    InteractionEngine::new()
        .interact(&mut page, &site, Some("hello"))
        .await
        .unwrap();

    assert!(page.calls.contains(&"click:button.send".to_string()));
    assert!(!page.called("press"));
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_is_reported() {
    let mut backend = ScriptedBackend::new();
    backend.submit_error = Some(BackendError::NotFound {
        selector: "#prompt".into(),
    });
    let mut page = launched(backend).await;

    let err = InteractionEngine::new()
        .interact(&mut page, &adapter(SubmitStrategy::PressEnter), Some("hello"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "submit_failed");
    assert!(!page.called("query"));
}

#[tokio::test(start_paused = true)]
async fn test_flat_settle_waits_full_response_timeout() {
    let mut page = launched(ScriptedBackend::new()).await;
    let site = adapter(SubmitStrategy::PressEnter).with_timeouts(1000, 5000);

    let started = Instant::now();
    InteractionEngine::new()
        .interact(&mut page, &site, Some("hello"))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn test_busy_indicator_ends_settle_early() {
    let mut page = launched(ScriptedBackend::new().busy_for(".stop", 2)).await;
    let site = adapter(SubmitStrategy::PressEnter)
        .with_timeouts(1000, 60_000)
        .with_busy_selector(".stop", 500);

    let started = Instant::now();
    InteractionEngine::new()
        .interact(&mut page, &site, Some("hello"))
        .await
        .unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1500));
    assert!(elapsed < Duration::from_millis(60_000));
    assert_eq!(page.ops().iter().filter(|op| **op == "present").count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_busy_indicator_bounded_by_response_timeout() {
    let mut page = launched(ScriptedBackend::new().busy_for(".stop", usize::MAX)).await;
    let site = adapter(SubmitStrategy::PressEnter)
        .with_timeouts(1000, 2000)
        .with_busy_selector(".stop", 500);

    let started = Instant::now();
    let result = InteractionEngine::new()
        .interact(&mut page, &site, Some("hello"))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(2600));
    assert!(matches!(result, Interaction::Answered { .. }));
}
