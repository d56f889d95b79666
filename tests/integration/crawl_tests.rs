//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl-and-mirror cycle end-to-end.

use roundabout::config::{Config, CrawlerConfig, NodeConfig, OutputConfig, UserAgentConfig};
use roundabout::crawler::Crawler;
use roundabout::output::Outcome;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration mirroring `base_url` under `mirror_root`
fn create_test_config(base_url: &str, mirror_root: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: base_url.to_string(),
            max_concurrent_fetches: 4,
            request_timeout: 5,
            reject: vec![],
            follow_assets: true,
        },
        node: NodeConfig::default(),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            mirror_root: mirror_root.display().to_string(),
            subfolder: "v2".to_string(),
            clean: true,
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount_page(server: &MockServer, page: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_mirror_of_small_site() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/",
        html(
            r#"<html><head>
                <link rel="stylesheet" href="/style.css">
            </head><body>
                <a href="/about">About</a>
                <a href="/api/items" data-remote="true">Items</a>
                <a href="http://elsewhere.invalid/page">Elsewhere</a>
            </body></html>"#,
        ),
        1,
    )
    .await;
    mount_page(&mock_server, "/about", html(r#"<a href="/">Home</a>"#), 1).await;
    mount_page(&mock_server, "/api/items", html("<ul></ul>"), 1).await;
    mount_page(
        &mock_server,
        "/api/items.js",
        ResponseTemplate::new(200).set_body_raw("render([])", "application/javascript"),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/style.css",
        ResponseTemplate::new(200).set_body_raw(
            "body { background-image: url(/img/bg.png); }",
            "text/css",
        ),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/img/bg.png",
        ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
        1,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::new(config).expect("Failed to create crawler");
    let stats = crawler.run().await.expect("Crawl failed");

    assert_eq!(stats.dispatched, 6);
    assert_eq!(stats.count(Outcome::Stored), 6);
    assert!(crawler.is_done());

    let store = crawler.store_path().to_path_buf();
    let index = std::fs::read_to_string(store.join("index.html")).unwrap();
    assert!(index.contains(r#"href="/v2/about.html""#));
    assert!(index.contains(r#"href="/v2/style.css""#));
    assert!(index.contains(r#"href="/v2/api/items.html""#));
    assert!(index.contains(r#"href="http://elsewhere.invalid/page""#));

    let about = std::fs::read_to_string(store.join("about.html")).unwrap();
    assert!(about.contains(r#"href="/v2/index.html""#));

    let css = std::fs::read_to_string(store.join("style.css")).unwrap();
    assert_eq!(css, "body { background-image: url(/v2/img/bg.png); }");

    assert_eq!(
        std::fs::read(store.join("img/bg.png")).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );
    assert_eq!(
        std::fs::read_to_string(store.join("api/items.js")).unwrap(),
        "render([])"
    );
    assert!(store.join("api/items.html").exists());
}

#[tokio::test]
async fn test_self_linking_page_with_queries_terminates() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // Every variant of the page links to every other variant
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r##"<a href="/?page=2">2</a><a href="?page=3">3</a><a href="/">1</a><a href="#top">top</a>"##,
        ))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::new(config).unwrap();
    crawler.run().await.unwrap();

    let base = format!("{}/", mock_server.uri());
    assert_eq!(
        crawler.sitemap(),
        vec![
            base.clone(),
            format!("{}?page=2", base),
            format!("{}?page=3", base),
        ]
    );

    let store = crawler.store_path();
    assert!(store.join("index.html").exists());
    assert!(store.join("index.html?page=2").exists());
    assert!(store.join("index.html?page=3").exists());
}

#[tokio::test]
async fn test_error_status_is_not_stored() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&mock_server, "/", html(r#"<a href="/missing">Missing</a>"#), 1).await;
    mount_page(&mock_server, "/missing", ResponseTemplate::new(404), 1).await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::new(config).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.count(Outcome::Stored), 1);
    assert_eq!(stats.count(Outcome::HttpError), 1);
    assert!(!crawler.store_path().join("missing.html").exists());
    assert!(!crawler.store_path().join("missing").exists());
}

#[tokio::test]
async fn test_unknown_content_type_is_skipped() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&mock_server, "/", html(r#"<a href="/data.json">Data</a>"#), 1).await;
    mount_page(
        &mock_server,
        "/data.json",
        ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
        1,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::new(config).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.count(Outcome::Skipped), 1);
    assert!(!crawler.store_path().join("data.json").exists());
}

#[tokio::test]
async fn test_rejected_urls_are_never_fetched() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/",
        html(r#"<a href="/logout">Log out</a><a href="/archive.zip">Zip</a><a href="/keep">Keep</a>"#),
        1,
    )
    .await;
    mount_page(&mock_server, "/logout", html("bye"), 0).await;
    mount_page(&mock_server, "/archive.zip", html("zip"), 0).await;
    mount_page(&mock_server, "/keep", html("kept"), 1).await;

    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.crawler.reject = vec!["*/logout*".to_string(), "*.zip".to_string()];

    let mut crawler = Crawler::new(config).unwrap();
    crawler.run().await.unwrap();

    assert_eq!(crawler.sitemap().len(), 2);

    // Rejected links were never mirrored, so they still point at the site
    let index = std::fs::read_to_string(crawler.store_path().join("index.html")).unwrap();
    assert_eq!(
        index,
        r#"<a href="/logout">Log out</a><a href="/archive.zip">Zip</a><a href="/v2/keep.html">Keep</a>"#
    );
}

#[tokio::test]
async fn test_reject_closure_replaces_patterns() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/",
        html(r#"<a href="/private/a">A</a><a href="/public/b">B</a>"#),
        1,
    )
    .await;
    mount_page(&mock_server, "/private/a", html("a"), 0).await;
    mount_page(&mock_server, "/public/b", html("b"), 1).await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::builder(config)
        .reject(|url| url.contains("/private/"))
        .build()
        .unwrap();
    crawler.run().await.unwrap();
}

#[tokio::test]
async fn test_each_url_fetched_once_across_runs() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&mock_server, "/", html(r#"<a href="/a">A</a>"#), 1).await;
    mount_page(&mock_server, "/a", html(r#"<a href="/">Home</a>"#), 1).await;
    mount_page(&mock_server, "/b", html(r#"<a href="/a">A</a>"#), 1).await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::new(config).unwrap();

    let completions = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&completions);
    let r = Arc::clone(&runs);
    crawler
        .on_complete(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    crawler
        .after_run(move || {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    crawler.run().await.unwrap();
    assert_eq!(completions.load(Ordering::SeqCst), 1);

    // Already visited URLs are ignored; only /b is new
    let added = crawler.push(["/", "/a", "/b"]);
    assert_eq!(added, 1);
    crawler.run().await.unwrap();

    assert_eq!(completions.load(Ordering::SeqCst), 2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(crawler.sitemap().len(), 3);
}

#[tokio::test]
async fn test_handle_pushes_between_runs() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&mock_server, "/", html("<p>home</p>"), 1).await;
    mount_page(&mock_server, "/extra", html("<p>extra</p>"), 1).await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::new(config).unwrap();
    let handle = crawler.handle();

    let done = crawler.subscribe();

    crawler.run().await.unwrap();
    assert!(crawler.is_done());

    assert!(handle.push([format!("{}/extra", mock_server.uri())]));
    assert!(!crawler.is_done());
    assert!(!*done.borrow());

    crawler.run().await.unwrap();

    assert!(crawler.is_done());
    assert!(crawler.store_path().join("extra.html").exists());
}

#[tokio::test]
async fn test_fragments_survive_in_stored_pages() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/",
        html(r##"<h1 id="top">Home</h1><a href="#top">Top</a><a href="/about#team">Team</a>"##),
        1,
    )
    .await;
    mount_page(&mock_server, "/about", html(r##"<a href="/#top">Home</a>"##), 1).await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::new(config).unwrap();
    crawler.run().await.unwrap();

    let store = crawler.store_path().to_path_buf();
    let index = std::fs::read_to_string(store.join("index.html")).unwrap();
    assert_eq!(
        index,
        r##"<h1 id="top">Home</h1><a href="#top">Top</a><a href="/v2/about.html#team">Team</a>"##
    );

    let about = std::fs::read_to_string(store.join("about.html")).unwrap();
    assert_eq!(about, r##"<a href="/v2/index.html#top">Home</a>"##);
}

#[tokio::test]
async fn test_clean_removes_previous_mirror() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_page(&mock_server, "/", html("<p>home</p>"), 1).await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let first = Crawler::new(config.clone()).unwrap();
    let stale = first.store_path().join("stale.html");
    std::fs::write(&stale, "old").unwrap();

    let mut second = Crawler::new(config).unwrap();
    assert!(!stale.exists());
    second.run().await.unwrap();
    assert!(second.store_path().join("index.html").exists());
}

#[tokio::test]
async fn test_connection_failure_is_recorded() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    drop(mock_server);

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, dir.path());
    let mut crawler = Crawler::new(config).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.count(Outcome::FetchFailed), 1);
    assert!(crawler.is_done());
}

#[tokio::test]
async fn test_query_param_pages_are_distinct_files() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&mock_server, "/", html(r#"<a href="/list?page=2">Next</a>"#), 1).await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "2"))
        .respond_with(html("<p>page two</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let mut crawler = Crawler::new(config).unwrap();
    crawler.run().await.unwrap();

    let index = std::fs::read_to_string(crawler.store_path().join("index.html")).unwrap();
    assert!(index.contains(r#"href="/v2/list?page=2.html""#));
    assert!(crawler.store_path().join("list?page=2.html").exists());
}
