mod common;

use common::{item_html, item_payload, profile_html, proxy, Page, ScriptedFactory, Site};
use reelharvest_core::{
    AppConfig, ScrapeResult, EMPTY_BIO_SENTINEL, PROFILE_SENTINEL, SKIPPED_SENTINEL, UNKNOWN_USERNAME,
};
use reelharvest_proxy::{ProxySource, RoundRobinRotation};
use reelharvest_scanner::{ScanError, ScrapeEvent, ScrapeOrchestrator};
use std::sync::Arc;
use tokio::sync::mpsc;

const ITEM: &str = "https://www.tiktok.com/@runner/video/7301";
const PROFILE: &str = "https://www.tiktok.com/@runner";

fn rotation(count: u8) -> Arc<RoundRobinRotation> {
    let endpoints = (1..=count).map(proxy).collect();
    Arc::new(RoundRobinRotation::new(endpoints).expect("build rotation"))
}

fn orchestrator(
    factory: ScriptedFactory,
    rotation: &Arc<RoundRobinRotation>,
) -> (Arc<ScriptedFactory>, ScrapeOrchestrator<ScriptedFactory>) {
    let factory = Arc::new(factory);
    let source: Arc<dyn ProxySource> = rotation.clone();
    let orchestrator = ScrapeOrchestrator::new(Arc::clone(&factory), source, &AppConfig::default());
    (factory, orchestrator)
}

fn runner_site() -> Site {
    Site::new()
        .page(
            ITEM,
            Page::html(item_html("Leg day #fitness", "1.5K", "runner"))
                .with_payload(item_payload("Leg day #fitness", "runner", 5400)),
        )
        .page(
            PROFILE,
            Page::html(profile_html(
                "Coach | biz: runner@mail.com | ttv: runner_live",
                &["https://www.instagram.com/runner", "https://github.com/runner"],
            )),
        )
}

#[tokio::test]
async fn test_structured_item_with_profile_enrichment() {
    let rotation = rotation(2);
    let (factory, orchestrator) = orchestrator(ScriptedFactory::new(runner_site()), &rotation);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    assert_eq!(results.len(), 1);
    let record = results[0].record().expect("success");
    assert_eq!(record.caption, "Leg day #fitness");
    assert_eq!(record.hashtags, vec!["#fitness".to_string()]);
    assert_eq!(record.like_count, 5400);
    assert_eq!(record.comment_count, 12);
    assert_eq!(record.share_count, 1200);
    assert_eq!(record.username, "runner");
    assert_eq!(record.upload_timestamp_raw, "1700000000");
    assert_eq!(record.thumbnail_url, "https://cdn.example/payload.jpg");
    assert_eq!(record.email, "runner@mail.com");
    assert_eq!(record.instagram_link, "https://www.instagram.com/runner");
    assert_eq!(
        record.other_links,
        vec![
            "https://github.com/runner".to_string(),
            "https://twitch.tv/runner_live".to_string(),
        ]
    );
    assert_eq!(results[0].retry_count(), 0);
    assert_eq!(factory.log.created(), 1);
    assert_eq!(factory.log.closed(), 1);
}

#[tokio::test]
async fn test_dom_fallback_without_payload() {
    let site = Site::new().page(
        ITEM,
        Page::html(item_html("Morning run #cardio #5k", "2.3K", "runner")),
    );
    let rotation = rotation(1);
    let (_factory, orchestrator) = orchestrator(ScriptedFactory::new(site), &rotation);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    let record = results[0].record().expect("success");
    assert_eq!(record.caption, "Morning run #cardio #5k");
    assert_eq!(record.hashtags, vec!["#cardio".to_string(), "#5k".to_string()]);
    assert_eq!(record.like_count, 2300);
    assert_eq!(record.comment_count, 87);
    assert_eq!(record.share_count, 1204);
    assert_eq!(record.username, "runner");
    assert_eq!(record.upload_timestamp_raw, "2024-3-1");
    assert_eq!(record.thumbnail_url, "https://cdn.example/cover.jpg");
    // Profile page has no bio element.
    assert_eq!(record.bio, EMPTY_BIO_SENTINEL);
}

#[tokio::test]
async fn test_malformed_payload_falls_back_to_dom() {
    let broken_payload = serde_json::json!({
        "__DEFAULT_SCOPE__": {
            "webapp.video-detail": { "itemInfo": { "itemStruct": { "desc": 42 } } }
        }
    });
    let site = Site::new().page(
        ITEM,
        Page::html(item_html("From the DOM", "10", "runner")).with_payload(broken_payload),
    );
    let rotation = rotation(1);
    let (_factory, orchestrator) = orchestrator(ScriptedFactory::new(site), &rotation);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    assert_eq!(results[0].record().expect("success").caption, "From the DOM");
}

#[tokio::test]
async fn test_skip_profile_enrichment_sentinels() {
    let rotation = rotation(1);
    let factory = Arc::new(ScriptedFactory::new(runner_site()));
    let mut config = AppConfig::default();
    config.scraping.skip_profile_enrichment = true;
    let source: Arc<dyn ProxySource> = rotation.clone();
    let orchestrator = ScrapeOrchestrator::new(Arc::clone(&factory), source, &config);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    let record = results[0].record().expect("success");
    assert_eq!(record.bio, SKIPPED_SENTINEL);
    assert_eq!(record.email, SKIPPED_SENTINEL);
    assert_eq!(record.instagram_link, SKIPPED_SENTINEL);
    assert_eq!(record.other_links, vec![SKIPPED_SENTINEL.to_string()]);
    assert!(!factory.log.navigations().contains(&PROFILE.to_string()));
}

#[tokio::test]
async fn test_enrichment_failure_keeps_item() {
    let site = runner_site().broken(PROFILE);
    let rotation = rotation(1);
    let (_factory, orchestrator) = orchestrator(ScriptedFactory::new(site), &rotation);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    let record = results[0].record().expect("success");
    assert_eq!(record.like_count, 5400);
    assert_eq!(record.bio, "");
    assert_eq!(record.email, "");
    assert_eq!(results[0].retry_count(), 0);
}

#[tokio::test]
async fn test_profile_only_url() {
    let rotation = rotation(1);
    let (_factory, orchestrator) = orchestrator(ScriptedFactory::new(runner_site()), &rotation);

    let results = orchestrator
        .run(&[PROFILE.to_string()], 1)
        .await
        .expect("run");

    let record = results[0].record().expect("success");
    assert_eq!(record.caption, PROFILE_SENTINEL);
    assert_eq!(record.hashtags, vec![PROFILE_SENTINEL.to_string()]);
    assert_eq!(record.upload_timestamp_raw, PROFILE_SENTINEL);
    assert_eq!(record.thumbnail_url, PROFILE_SENTINEL);
    assert_eq!(record.like_count, 0);
    assert_eq!(record.username, "runner");
    assert_eq!(record.email, "runner@mail.com");
}

#[tokio::test]
async fn test_retry_on_new_proxy_succeeds() {
    let rotation = rotation(3);
    let factory = ScriptedFactory::new(runner_site()).dead_proxy(&proxy(1));
    let (factory, orchestrator) = orchestrator(factory, &rotation);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator.with_events(tx);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");
    drop(orchestrator);

    assert!(results[0].is_success());
    assert_eq!(results[0].retry_count(), 1);
    assert_eq!(results[0].proxy_used(), proxy(2).key());
    assert_eq!(rotation.failed_count(), 1);
    assert_eq!(factory.log.created(), 2);
    assert_eq!(factory.log.closed(), 2);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        ScrapeEvent::Retrying {
            url: ITEM.to_string(),
            attempt: 1,
            proxy: proxy(2).key(),
        }
    );
    assert!(matches!(&events[1], ScrapeEvent::Completed(r) if r.is_success()));
}

#[tokio::test]
async fn test_retries_exhausted_gives_failure() {
    let rotation = rotation(3);
    let factory = ScriptedFactory::new(runner_site())
        .dead_proxy(&proxy(1))
        .dead_proxy(&proxy(2));
    let (factory, orchestrator) = orchestrator(factory, &rotation);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    match &results[0] {
        ScrapeResult::Failure {
            url,
            proxy_used,
            retry_count,
            error,
        } => {
            assert_eq!(url, ITEM);
            assert_eq!(proxy_used, &proxy(2).key());
            assert_eq!(*retry_count, 1);
            assert!(error.contains("refused connection"), "{error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    // Only the first proxy is marked; the last attempt's proxy is not.
    assert_eq!(rotation.failed_count(), 1);
    assert_eq!(factory.log.created(), factory.log.closed());
}

#[tokio::test]
async fn test_more_retries_walk_the_pool() {
    let rotation = rotation(3);
    let factory = ScriptedFactory::new(runner_site())
        .dead_proxy(&proxy(1))
        .dead_proxy(&proxy(2));
    let (_factory, orchestrator) = orchestrator(factory, &rotation);
    let orchestrator = orchestrator.with_max_retries(2);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    assert!(results[0].is_success());
    assert_eq!(results[0].retry_count(), 2);
    assert_eq!(results[0].proxy_used(), proxy(3).key());
}

#[tokio::test]
async fn test_pool_exhausted_during_retry() {
    let rotation = rotation(1);
    let factory = ScriptedFactory::new(runner_site()).dead_proxy(&proxy(1));
    let (_factory, orchestrator) = orchestrator(factory, &rotation);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    assert!(!results[0].is_success());
    assert_eq!(results[0].retry_count(), 0);
    assert_eq!(results[0].proxy_used(), proxy(1).key());
    assert!(!rotation.has_available());
}

#[tokio::test]
async fn test_session_open_failure_is_retried() {
    let rotation = rotation(2);
    let factory = ScriptedFactory::new(runner_site()).unopenable_proxy(&proxy(1));
    let (factory, orchestrator) = orchestrator(factory, &rotation);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    assert!(results[0].is_success());
    assert_eq!(results[0].retry_count(), 1);
    assert_eq!(factory.log.proxies(), vec![proxy(1).key(), proxy(2).key()]);
    assert_eq!(factory.log.created(), 1);
    assert_eq!(factory.log.closed(), 1);
}

#[tokio::test]
async fn test_run_fails_when_no_proxy_available() {
    let rotation = rotation(1);
    rotation.mark_failed(&proxy(1));
    let (factory, orchestrator) = orchestrator(ScriptedFactory::new(runner_site()), &rotation);

    let err = orchestrator
        .run(&[ITEM.to_string()], 1)
        .await
        .expect_err("no proxies");

    assert!(matches!(err, ScanError::Proxy(_)));
    assert_eq!(factory.log.created(), 0);
}

#[tokio::test]
async fn test_concurrency_limit_holds() {
    let mut site = Site::new();
    let mut urls = Vec::new();
    for i in 0..8 {
        let url = format!("https://www.tiktok.com/@crew/video/{i}");
        site = site.page(&url, Page::html(item_html("clip", "3", "crew")));
        urls.push(url);
    }
    let mut config = AppConfig::default();
    config.scraping.skip_profile_enrichment = true;

    let factory = Arc::new(ScriptedFactory::new(site));
    let source: Arc<dyn ProxySource> = rotation(4);
    let orchestrator = ScrapeOrchestrator::new(Arc::clone(&factory), source, &config);

    let results = orchestrator.run(&urls, 3).await.expect("run");

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(ScrapeResult::is_success));
    let peak = factory.log.peak_open();
    assert!(peak <= 3, "peak of {peak} sessions");
    assert!(peak > 1, "tasks never overlapped");
    assert_eq!(factory.log.created(), factory.log.closed());
}

#[tokio::test]
async fn test_every_url_gets_a_result() {
    let mut site = runner_site();
    let mut urls = vec![ITEM.to_string(), PROFILE.to_string()];
    for i in 0..4 {
        let url = format!("https://www.tiktok.com/@crew/video/{i}");
        site = site.page(&url, Page::html(item_html("clip", "3", "crew")));
        urls.push(url);
    }
    // No markup at all: extraction fails on every attempt.
    urls.push("https://www.tiktok.com/@ghost/video/404".to_string());

    let rotation = rotation(4);
    let (factory, orchestrator) = orchestrator(ScriptedFactory::new(site), &rotation);

    let results = orchestrator.run(&urls, 2).await.expect("run");

    assert_eq!(results.len(), urls.len());
    for url in &urls {
        assert_eq!(results.iter().filter(|r| r.url() == url).count(), 1, "{url}");
    }
    let ghost = results
        .iter()
        .find(|r| r.url().contains("ghost"))
        .expect("ghost result");
    assert!(!ghost.is_success());
    assert_eq!(ghost.retry_count(), 1);
    assert_eq!(results.iter().filter(|r| r.is_success()).count(), 6);
    assert_eq!(factory.log.created(), factory.log.closed());
}

#[tokio::test]
async fn test_unknown_username_skips_enrichment() {
    let site = Site::new().page(
        ITEM,
        Page::html(item_html("anon", "1", "")).with_payload(item_payload("anon", "", 1)),
    );
    let rotation = rotation(1);
    let (factory, orchestrator) = orchestrator(ScriptedFactory::new(site), &rotation);

    let results = orchestrator.run(&[ITEM.to_string()], 1).await.expect("run");

    let record = results[0].record().expect("success");
    assert_eq!(record.username, UNKNOWN_USERNAME);
    assert_eq!(record.bio, "");
    assert_eq!(factory.log.navigations(), vec![ITEM.to_string()]);
}

#[tokio::test]
async fn test_empty_url_list() {
    let rotation = rotation(1);
    let (factory, orchestrator) = orchestrator(ScriptedFactory::new(Site::new()), &rotation);

    let results = orchestrator.run(&[], 4).await.expect("run");

    assert!(results.is_empty());
    assert_eq!(factory.log.created(), 0);
}
