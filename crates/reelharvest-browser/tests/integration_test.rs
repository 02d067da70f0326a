use reelharvest_browser::{BrowserSession, ChromiumEngine, SessionFactory, WaitStrategy};
use reelharvest_core::{BrowserConfig, ProxyEndpoint};
use std::time::Duration;

fn local_proxy() -> ProxyEndpoint {
    ProxyEndpoint::new("127.0.0.1", 8888, "user", "pass")
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_engine_launch() {
    let engine = ChromiumEngine::launch(&BrowserConfig::default()).await;
    assert!(engine.is_ok(), "Failed to launch browser engine");
    engine.unwrap().shutdown().await;
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium and a proxy on 127.0.0.1:8888
async fn test_session_navigation_and_queries() {
    let engine = ChromiumEngine::launch(&BrowserConfig::default())
        .await
        .unwrap();
    let session = engine.create_session(&local_proxy()).await.unwrap();

    session
        .navigate(
            "https://example.com",
            WaitStrategy::ContentLoaded,
            Duration::from_secs(30),
        )
        .await
        .unwrap();

    let heading = session.query_text("h1").await.unwrap();
    assert_eq!(heading.as_deref(), Some("Example Domain"));
    assert!(!session.query_all_links().await.unwrap().is_empty());
    assert!(session.query_text("#does-not-exist").await.unwrap().is_none());

    engine.close_session(session).await;
    engine.shutdown().await;
}
