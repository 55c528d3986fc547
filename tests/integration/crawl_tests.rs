//! End-to-end crawl behavior of the orchestrator

use crate::support::{site, test_config, MockDriver, Script, ScriptedSummarizer, ROOT};
use crawlscribe::config::Config;
use crawlscribe::policy::WordlistPolicy;
use crawlscribe::{FailureKind, Orchestrator, ScribeError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn orchestrator(
    config: &Config,
    driver: &Arc<MockDriver>,
    summarizer: &Arc<ScriptedSummarizer>,
) -> Orchestrator {
    let policy = WordlistPolicy::from_config(&config.policy).unwrap();
    Orchestrator::new(
        config,
        driver.clone(),
        Arc::new(policy),
        summarizer.clone(),
    )
}

fn summarizer() -> Arc<ScriptedSummarizer> {
    Arc::new(ScriptedSummarizer::new(Script::Summarize))
}

#[tokio::test]
async fn test_crawl_small_site() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.max_depth = 2;

    let driver = Arc::new(MockDriver::new(site(&[
        ("/", &["/a", "https://other.test/x"]),
        ("/a", &["/"]),
    ])));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    let keys: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["https://site.test", "https://site.test/a"]);
    assert!(results.values().all(|r| r.is_success()));
    assert_eq!(driver.total_navigations(), 2);

    let root = &results["https://site.test"];
    let content = std::fs::read_to_string(root.content_path().unwrap()).unwrap();
    assert!(content.contains("Welcome to /"));
    let processed = std::fs::read_to_string(root.processed_content_path().unwrap()).unwrap();
    assert!(processed.starts_with("# https://site.test"));
    assert_eq!(root.screenshot_paths().len(), 1);
    let route_dir = root.content_path().unwrap().parent().unwrap();
    assert_eq!(route_dir.parent().unwrap(), dir.path());
    assert!(route_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("index-"));
}

#[tokio::test]
async fn test_each_url_is_navigated_once() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.link_batch_size = 10;

    let driver = Arc::new(
        MockDriver::new(site(&[
            ("/", &["/a", "/b", "/c", "/a/", "http://www.site.test/b"]),
            ("/a", &["/shared", "/b", "/c"]),
            ("/b", &["/shared", "/a", "/c"]),
            ("/c", &["/shared", "/a", "/b#top"]),
            ("/shared", &["/", "/a"]),
        ]))
        .with_delay(Duration::from_millis(20)),
    );
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    let navigations = driver.navigations();
    assert_eq!(navigations.len(), 5);
    assert!(navigations.values().all(|&count| count == 1));
}

#[tokio::test]
async fn test_depth_ceiling() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.max_depth = 1;

    let driver = Arc::new(MockDriver::new(site(&[
        ("/", &["/one"]),
        ("/one", &["/two"]),
        ("/two", &["/three"]),
        ("/three", &[]),
    ])));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    let navigations = driver.navigations();
    assert!(navigations.contains_key("/one"));
    assert!(!navigations.contains_key("/two"));
    assert!(!navigations.contains_key("/three"));
    assert!(!results.contains_key("https://site.test/two"));
}

#[tokio::test]
async fn test_depth_zero_visits_only_root() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.max_depth = 0;

    let driver = Arc::new(MockDriver::new(site(&[("/", &["/a"]), ("/a", &[])])));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(driver.total_navigations(), 1);
}

#[tokio::test]
async fn test_other_origins_are_not_followed() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let driver = Arc::new(MockDriver::new(site(&[
        (
            "/",
            &[
                "https://other.test/",
                "https://sub.site.test/page",
                "https://site.test:8443/page",
                "/local",
            ],
        ),
        ("/local", &[]),
    ])));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.keys().all(|key| key.starts_with("https://site.test")));
    assert!(!results.keys().any(|key| key.contains(":8443")));
    assert_eq!(driver.total_navigations(), 2);
}

#[tokio::test]
async fn test_non_textual_links_are_skipped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let driver = Arc::new(MockDriver::new(site(&[
        ("/", &["/report.pdf", "/logo.png", "/archive.zip", "/docs"]),
        ("/docs", &[]),
    ])));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.contains_key("https://site.test/docs"));
    assert!(!driver.navigations().contains_key("/report.pdf"));
}

#[tokio::test]
async fn test_concurrency_bound() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.max_concurrent_pages = 2;
    config.crawler.link_batch_size = 12;

    let children: Vec<String> = (0..12).map(|i| format!("/p{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    let mut pages: Vec<(&str, &[&str])> = Vec::new();
    pages.push(("/", child_refs.as_slice()));
    for child in &child_refs {
        pages.push((*child, &[]));
    }

    let driver = Arc::new(MockDriver::new(site(&pages)).with_delay(Duration::from_millis(15)));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(results.len(), 13);
    assert!(results.values().all(|r| r.is_success()));
    assert!(driver.max_open() <= 2, "max open was {}", driver.max_open());
}

#[tokio::test]
async fn test_second_run_resumes_from_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pages = site(&[("/", &["/a"]), ("/a", &["/b"]), ("/b", &[])]);

    let first_driver = Arc::new(MockDriver::new(pages.clone()));
    let first = orchestrator(&config, &first_driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();
    assert_eq!(first_driver.total_navigations(), 3);

    let second_driver = Arc::new(MockDriver::new(pages));
    let second = orchestrator(&config, &second_driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(second_driver.total_navigations(), 0);
    assert_eq!(first.len(), second.len());
    for (key, result) in &first {
        let resumed = &second[key];
        assert!(resumed.is_success());
        assert_eq!(result.content_path(), resumed.content_path());
        assert_eq!(
            result.processed_content_path(),
            resumed.processed_content_path()
        );
    }
}

#[tokio::test]
async fn test_quota_errors_fall_back_to_filtered_text() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.policy.blocked_words = vec!["welcome".to_string()];

    let driver = Arc::new(MockDriver::new(site(&[("/", &["/a"]), ("/a", &[])])));
    let quota = Arc::new(ScriptedSummarizer::new(Script::Quota));
    let results = orchestrator(&config, &driver, &quota)
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(quota.calls.load(Ordering::SeqCst), 2);
    for result in results.values() {
        assert!(result.is_success());
        let content = std::fs::read_to_string(result.content_path().unwrap()).unwrap();
        let processed =
            std::fs::read_to_string(result.processed_content_path().unwrap()).unwrap();
        assert!(!processed.is_empty());
        assert_eq!(processed, content);
        assert!(content.starts_with("[FILTERED] to"));
    }
}

#[tokio::test]
async fn test_invalid_root_fails_before_launch() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let driver = Arc::new(MockDriver::new(site(&[("/", &[])])));

    let result = orchestrator(&config, &driver, &summarizer())
        .scrape_website("ftp://site.test/")
        .await;

    assert!(matches!(result, Err(ScribeError::InvalidRootUrl { .. })));
    assert_eq!(driver.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_launch_failure_fails_the_crawl() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let driver = Arc::new(MockDriver::new(site(&[("/", &[])])).failing_launch());

    let result = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await;

    assert!(matches!(result, Err(ScribeError::BrowserLaunch(_))));
    assert_eq!(driver.launches.load(Ordering::SeqCst), 2);
    assert_eq!(driver.total_navigations(), 0);
}

#[tokio::test]
async fn test_shutdown_short_circuits_visits() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let driver = Arc::new(MockDriver::new(site(&[("/", &["/a"]), ("/a", &[])])));

    let orchestrator = orchestrator(&config, &driver, &summarizer());
    orchestrator.shutdown_signal().trigger();
    let results = orchestrator.scrape_website(ROOT).await.unwrap();

    assert_eq!(results.len(), 1);
    let root = &results["https://site.test"];
    assert_eq!(root.error().map(|e| e.kind), Some(FailureKind::Shutdown));
    assert!(root.content_path().is_none());
    assert_eq!(driver.total_navigations(), 0);
}

#[tokio::test]
async fn test_shutdown_during_crawl_stops_waiting_pages() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.max_concurrent_pages = 1;
    config.crawler.link_batch_size = 10;

    let children: Vec<String> = (0..10).map(|i| format!("/p{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    let mut pages: Vec<(&str, &[&str])> = Vec::new();
    pages.push(("/", child_refs.as_slice()));
    for child in &child_refs {
        pages.push((*child, &[]));
    }

    let driver = Arc::new(MockDriver::new(site(&pages)).with_delay(Duration::from_millis(100)));
    let summarizer = summarizer();
    let orchestrator = orchestrator(&config, &driver, &summarizer);

    // Stop once the first child is being driven
    let shutdown = orchestrator.shutdown_signal();
    let watched = driver.clone();
    tokio::spawn(async move {
        while watched.total_navigations() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.trigger();
    });

    let results = orchestrator.scrape_website(ROOT).await.unwrap();

    assert!(results["https://site.test"].is_success());
    assert!(
        driver.total_navigations() <= 3,
        "navigated {} pages after shutdown",
        driver.total_navigations()
    );
    assert!(summarizer.calls.load(Ordering::SeqCst) <= 2);

    let stopped: Vec<_> = results
        .values()
        .filter(|r| r.error().map(|e| e.kind) == Some(FailureKind::Shutdown))
        .collect();
    assert!(stopped.len() >= 8, "only {} pages stopped", stopped.len());
    assert!(stopped.iter().all(|r| r.content_path().is_none()));
}

#[tokio::test]
async fn test_links_beyond_max_depth_are_not_scheduled() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.max_depth = 0;
    config.crawler.link_batch_size = 1;
    config.crawler.link_batch_delay_ms = 500;

    let children: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    let driver = Arc::new(MockDriver::new(site(&[("/", child_refs.as_slice())])));

    let start = std::time::Instant::now();
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(results.len(), 1);
    assert_eq!(driver.total_navigations(), 1);
}

#[tokio::test]
async fn test_page_timeout_covers_summarizing() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.timeouts.page_ms = 200;

    let driver = Arc::new(MockDriver::new(site(&[("/", &["/a"]), ("/a", &[])])));
    let slow = Arc::new(ScriptedSummarizer::new(Script::Slow(Duration::from_secs(2))));

    let start = std::time::Instant::now();
    let results = orchestrator(&config, &driver, &slow)
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(results.len(), 1);
    let root = &results["https://site.test"];
    assert_eq!(root.error().map(|e| e.kind), Some(FailureKind::Timeout));
    assert!(root.content_path().is_none());
}

#[tokio::test]
async fn test_colliding_routes_keep_their_own_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let driver = Arc::new(MockDriver::new(site(&[
        ("/", &["/a-b", "/a/b"]),
        ("/a-b", &[]),
        ("/a/b", &[]),
    ])));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let dashed = results["https://site.test/a-b"].content_path().unwrap();
    let nested = results["https://site.test/a/b"].content_path().unwrap();
    assert_ne!(dashed.parent(), nested.parent());
    assert!(std::fs::read_to_string(dashed)
        .unwrap()
        .contains("Welcome to /a-b"));
    assert!(std::fs::read_to_string(nested)
        .unwrap()
        .contains("Welcome to /a/b"));
}

#[tokio::test]
async fn test_restricted_root_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.policy.restricted_domains = vec!["*.site.test".to_string()];

    let driver = Arc::new(MockDriver::new(site(&[("/", &[])])));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    let root = &results["https://site.test"];
    assert_eq!(root.error().map(|e| e.kind), Some(FailureKind::Restricted));
    assert_eq!(driver.total_navigations(), 0);
}

#[tokio::test]
async fn test_navigation_timeout_fails_only_that_page() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.timeouts.navigation_ms = 100;

    let driver = Arc::new(
        MockDriver::new(site(&[("/", &["/slow", "/fast"]), ("/slow", &[]), ("/fast", &[])]))
            .hanging("/slow"),
    );
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let slow = &results["https://site.test/slow"];
    assert_eq!(slow.error().map(|e| e.kind), Some(FailureKind::Timeout));
    assert!(results["https://site.test/fast"].is_success());
    assert!(results["https://site.test"].is_success());
}

#[tokio::test]
async fn test_missing_page_is_a_failed_result() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let driver = Arc::new(MockDriver::new(site(&[("/", &["/gone"])])));
    let results = orchestrator(&config, &driver, &summarizer())
        .scrape_website(ROOT)
        .await
        .unwrap();

    let gone = &results["https://site.test/gone"];
    assert_eq!(gone.error().map(|e| e.kind), Some(FailureKind::Navigation));
    assert!(gone.content_path().is_none());
    assert!(results["https://site.test"].is_success());
}

#[tokio::test]
async fn test_results_are_cached() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let driver = Arc::new(MockDriver::new(site(&[("/", &["/a"]), ("/a", &[])])));
    let orchestrator = orchestrator(&config, &driver, &summarizer());
    let results = orchestrator.scrape_website(ROOT).await.unwrap();

    let store = orchestrator.result_store();
    assert_eq!(store.len(), results.len());
    assert_eq!(store.get("https://site.test/a"), results.get("https://site.test/a").cloned());
}
