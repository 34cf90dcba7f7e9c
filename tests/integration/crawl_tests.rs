//! Integration tests for the ingest pipeline
//!
//! These tests use wiremock to stand up both the documentation site and an
//! Ollama-compatible service, then drive a full run end-to-end.

use async_trait::async_trait;
use doc_trawler::config::Config;
use doc_trawler::crawler::{run_ingest, Coordinator, FetchError, FetchedPage, Fetcher};
use doc_trawler::intelligence::{OllamaClient, FALLBACK_SUMMARY, FALLBACK_TITLE};
use doc_trawler::storage::JsonFileSink;
use doc_trawler::{DocumentChunk, PageUrl, Scope, SitemapStore, TrawlerError};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for a site and service, with politeness delays off
fn create_test_config(site: &str, service: &str, output: &Path) -> Config {
    let mut config = Config::default();
    config.crawl.url = format!("{}/docs", site);
    config.crawl.max_concurrent = 3;
    config.crawl.max_retries = 1;
    config.crawl.retry_delay_ms = 1;
    config.crawl.politeness_delay_ms = 0;
    config.crawl.politeness_jitter_ms = 0;
    config.output.output_dir = output.display().to_string();
    config.intelligence.base_url = service.to_string();
    config.intelligence.embedding_dim = 3;
    config.intelligence.embed_max_attempts = 2;
    config.intelligence.embed_backoff_base_ms = 1;
    config
}

fn html_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">{href}</a>"#))
        .collect::<Vec<_>>()
        .join("\n");
    let html = format!(
        "<html><head><title>{title}</title></head><body>\
         <h1>{title}</h1><p>This page documents {title}.</p>{anchors}</body></html>"
    );
    ResponseTemplate::new(200).set_body_raw(html, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

/// Mounts a healthy Ollama-compatible service
async fn healthy_service() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "0.5.1"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "{\"title\": \"Page title\", \"summary\": \"Page summary\"}"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.25, 0.5, 0.75]})),
        )
        .mount(&server)
        .await;

    server
}

fn sitemap_locs(path: &Path) -> Vec<String> {
    let xml = std::fs::read_to_string(path).expect("sitemap written");
    xml.lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("<loc>")
                .and_then(|rest| rest.strip_suffix("</loc>"))
                .map(str::to_string)
        })
        .collect()
}

fn chunk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("output dir exists")
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn read_chunk(path: &Path) -> DocumentChunk {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_full_ingest_stays_in_scope() {
    let site = MockServer::start().await;
    let service = healthy_service().await;
    let base = site.uri();
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&site)
        .await;

    // Each in-scope page is fetched once by discovery and once by the fetch phase
    mount_page(
        &site,
        "/docs",
        html_page("Docs", &["/docs/a", "/docs/b/", "/blog"]),
        2,
    )
    .await;
    mount_page(&site, "/docs/a", html_page("A", &["/docs/c", "/docs"]), 2).await;
    mount_page(&site, "/docs/b", html_page("B", &["/docs/c#install"]), 2).await;
    mount_page(&site, "/docs/c", html_page("C", &[]), 2).await;
    mount_page(&site, "/blog", html_page("Blog", &["/docs/hidden"]), 0).await;

    let config = create_test_config(&base, &service.uri(), output.path());
    let report = run_ingest(config).await.unwrap();

    assert_eq!(report.seeds, 4);
    assert_eq!(report.processed, 4);
    assert_eq!(report.dropped, 0);
    assert_eq!(report.chunks_written, 4);

    let locs = sitemap_locs(&output.path().join("sitemap.xml"));
    assert_eq!(
        locs,
        vec![
            format!("{base}/docs"),
            format!("{base}/docs/a"),
            format!("{base}/docs/b"),
            format!("{base}/docs/c"),
        ]
    );

    let files = chunk_files(output.path());
    assert_eq!(files.len(), 4);
    for file in &files {
        let chunk = read_chunk(file);
        assert_eq!(chunk.chunk_number, 0);
        assert_eq!(chunk.title, "Page title");
        assert_eq!(chunk.summary, "Page summary");
        assert_eq!(chunk.embedding, vec![0.25, 0.5, 0.75]);
        assert_eq!(chunk.metadata.source, chunk.url);
        assert_eq!(chunk.metadata.chunk_size, chunk.content.chars().count());
        assert!(chunk.metadata.url_path.starts_with("/docs"));
    }

    let sink = JsonFileSink::new(output.path());
    let c = read_chunk(&sink.chunk_path(&format!("{base}/docs/c"), 0));
    assert!(c.content.contains("This page documents C."));
}

#[tokio::test]
async fn test_unhealthy_service_aborts_before_discovery() {
    let site = MockServer::start().await;
    let service = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&service)
        .await;

    Mock::given(method("GET"))
        .respond_with(html_page("Docs", &[]))
        .expect(0)
        .mount(&site)
        .await;

    let config = create_test_config(&site.uri(), &service.uri(), output.path());
    let err = run_ingest(config).await.unwrap_err();

    assert!(matches!(err, TrawlerError::Intelligence(_)));
    assert!(!output.path().join("sitemap.xml").exists());
}

#[tokio::test]
async fn test_unreachable_root_reports_empty_sitemap() {
    let site = MockServer::start().await;
    let service = healthy_service().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;

    let config = create_test_config(&site.uri(), &service.uri(), output.path());
    let err = run_ingest(config).await.unwrap_err();

    assert!(matches!(err, TrawlerError::NoUrlsDiscovered { .. }));
}

#[tokio::test]
async fn test_enrichment_failures_fall_back() {
    let site = MockServer::start().await;
    let service = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "0.5.1"})))
        .mount(&service)
        .await;

    // Summaries are not retried
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&service)
        .await;

    // Embeddings use every attempt before falling back
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&service)
        .await;

    mount_page(&site, "/docs", html_page("Docs", &[]), 2).await;

    let config = create_test_config(&site.uri(), &service.uri(), output.path());
    let report = run_ingest(config).await.unwrap();
    assert_eq!(report.chunks_written, 1);

    let files = chunk_files(output.path());
    assert_eq!(files.len(), 1);
    let chunk = read_chunk(&files[0]);
    assert_eq!(chunk.title, FALLBACK_TITLE);
    assert_eq!(chunk.summary, FALLBACK_SUMMARY);
    assert_eq!(chunk.embedding, vec![0.0; 3]);
}

#[tokio::test]
async fn test_failing_page_retried_then_dropped() {
    let site = MockServer::start().await;
    let service = healthy_service().await;
    let output = TempDir::new().unwrap();

    mount_page(&site, "/docs", html_page("Docs", &["/docs/flaky"]), 2).await;

    // Discovery sees the page once, then it starts failing
    Mock::given(method("GET"))
        .and(path("/docs/flaky"))
        .respond_with(html_page("Flaky", &[]))
        .up_to_n_times(1)
        .expect(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&site)
        .await;

    let mut config = create_test_config(&site.uri(), &service.uri(), output.path());
    config.crawl.max_retries = 2;
    let report = run_ingest(config).await.unwrap();

    assert_eq!(report.seeds, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(report.dropped, 1);
}

#[tokio::test]
async fn test_robots_disallowed_pages_skipped() {
    let site = MockServer::start().await;
    let service = healthy_service().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /docs/private"),
        )
        .mount(&site)
        .await;

    mount_page(
        &site,
        "/docs",
        html_page("Docs", &["/docs/public", "/docs/private"]),
        2,
    )
    .await;
    mount_page(&site, "/docs/public", html_page("Public", &[]), 2).await;
    mount_page(&site, "/docs/private", html_page("Private", &[]), 0).await;

    let config = create_test_config(&site.uri(), &service.uri(), output.path());
    let report = run_ingest(config).await.unwrap();

    assert_eq!(report.processed, 2);
    let locs = sitemap_locs(&output.path().join("sitemap.xml"));
    assert!(!locs.iter().any(|loc| loc.ends_with("/docs/private")));
}

/// Serves the first `successes` requests, then fails every request
struct FlakyFetcher {
    successes: usize,
    calls: Mutex<usize>,
}

#[async_trait]
impl Fetcher for FlakyFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if call > self.successes {
            return Err(FetchError::Network {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }
        Ok(FetchedPage {
            url: PageUrl::from(url),
            title: None,
            text: "Some text.".to_string(),
            links: vec![],
            markup: None,
            base_url: None,
        })
    }
}

#[tokio::test]
async fn test_fault_injected_fetcher_attempt_count() {
    let service = healthy_service().await;
    let output = TempDir::new().unwrap();
    // Discovery succeeds, every fetch-phase attempt fails
    let fetcher = Arc::new(FlakyFetcher {
        successes: 1,
        calls: Mutex::new(0),
    });

    let mut config = create_test_config("https://ex.com", &service.uri(), output.path());
    config.crawl.max_retries = 4;
    let intelligence = Arc::new(OllamaClient::new(&config.intelligence).unwrap());
    let coordinator = Coordinator::new(
        config,
        fetcher.clone(),
        intelligence,
        Arc::new(JsonFileSink::new(output.path())),
    );

    let report = coordinator.run().await.unwrap();

    assert_eq!(*fetcher.calls.lock().unwrap(), 1 + 5);
    assert_eq!(report.seeds, 1);
    assert_eq!(report.processed, 0);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.chunks_written, 0);
    assert!(chunk_files(output.path()).is_empty());
}

#[test]
fn test_sitemap_round_trip_and_scope_change() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("sitemap.xml");
    let scope = Scope::new("https://ex.com/docs").unwrap();

    let store = SitemapStore::new(scope.clone(), &file);
    for url in [
        "https://ex.com/docs",
        "https://ex.com/docs/guide/",
        "https://ex.com/docs/api?lang=en&v=2",
        "https://ex.com/blog",
    ] {
        store.add(url);
    }
    store.save().unwrap();

    let loaded = store.load(&scope).unwrap();
    let saved: BTreeSet<PageUrl> = store.urls().into_iter().collect();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.len(), 3);

    let narrower = Scope::new("https://ex.com/docs/guide").unwrap();
    let loaded = store.load(&narrower).unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.contains(&PageUrl::from("https://ex.com/docs/guide")));
}
