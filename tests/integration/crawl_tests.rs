//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawl
//! sessions end-to-end with the HTTP renderer.

use site_audit::config::Config;
use site_audit::crawler::{ChannelSink, CrawlEvent, CrawlOutcome, CrawlSession, URL_FIELD};
use site_audit::output::MemorySink;
use site_audit::render::{HttpRenderer, HttpRendererConfig};
use site_audit::{FieldValue, PageResult, SessionConfig, SessionState};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a session configuration for a crawl starting at `start`
fn create_test_config(start: &str, out_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.crawler.urls = vec![start.to_string()];
    config.crawler.max_depth = 1;
    config.crawler.concurrency = Some(2);
    config.output.out_dir = out_dir.path().display().to_string();
    config
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

async fn run_crawl(config: &Config) -> (Vec<PageResult>, Vec<CrawlEvent>, SessionState, CrawlOutcome) {
    let session = SessionConfig::resolve(config, 4).expect("Failed to resolve session");
    let renderer = Arc::new(HttpRenderer::new(HttpRendererConfig {
        user_agent: session.user_agent.clone(),
        timeout: session.timeout,
    }));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut crawl = CrawlSession::new(session, renderer)
        .expect("Failed to create session")
        .with_sink(Arc::new(ChannelSink::new(tx)));

    let mut sink = MemorySink::default();
    let outcome = crawl.run(&mut sink).await.expect("Crawl failed");
    let state = crawl.state();
    drop(crawl);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (sink.into_pages(), events, state, outcome)
}

fn urls(pages: &[PageResult]) -> Vec<String> {
    let mut urls: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();
    urls.sort();
    urls
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    let base = server.uri();
    let port = url::Url::parse(&base).unwrap().port().unwrap();

    // localhost resolves to the same server but is a different host
    mount_html(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <h1>Welcome</h1>
            <a href="/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="http://localhost:{}/page3">Elsewhere</a>
            </body></html>"#,
            port
        ),
    )
    .await;
    mount_html(
        &server,
        "/page1",
        r#"<html><body><a href="/deeper">Deeper</a></body></html>"#.to_string(),
    )
    .await;
    mount_html(&server, "/page2", "<html><body>No title</body></html>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("{}/", base), &dir);
    let (pages, events, state, outcome) = run_crawl(&config).await;

    assert_eq!(
        urls(&pages),
        vec![
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
        ]
    );
    assert_eq!(state, SessionState::ExportPending);
    assert_eq!(outcome.pages, 3);

    let home = pages.iter().find(|p| p.depth == 0).unwrap();
    assert_eq!(home.value("result.title"), Some(&FieldValue::from("Home")));
    assert_eq!(home.value(URL_FIELD), Some(&FieldValue::from(format!("{}/", base).as_str())));
    let page1 = pages.iter().find(|p| p.url.ends_with("/page1")).unwrap();
    assert_eq!(page1.depth, 1);
    assert_eq!(page1.previous_url.as_deref(), Some(format!("{}/", base).as_str()));

    // /deeper would be depth 2
    assert!(events
        .iter()
        .any(|e| matches!(e, CrawlEvent::MaxDepthReached { url, .. } if url.ends_with("/page1"))));

    let titles = outcome.summary.get("title").expect("title diagnostics");
    assert_eq!(titles.len(), 2);
    assert!(titles.iter().all(|d| d.url != format!("{}/", base)));
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <a href="/public">Public</a>
        <a href="/private/area">Private</a>
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_html(&server, "/public", "<html><head><title>Public</title></head></html>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/private/area"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("{}/", base), &dir);
    let (pages, events, _, _) = run_crawl(&config).await;

    assert_eq!(urls(&pages), vec![format!("{}/", base), format!("{}/public", base)]);
    assert!(events
        .iter()
        .any(|e| matches!(e, CrawlEvent::RequestDisallowed { url } if url.ends_with("/private/area"))));
}

#[tokio::test]
async fn test_documents_are_not_requested() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <a href="/files/price.PDF">Price list</a>
        </body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/price.PDF"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("{}/", base), &dir);
    let (pages, _, _, outcome) = run_crawl(&config).await;

    let document = pages.iter().find(|p| p.is_document).expect("document row");
    assert!(document.url.ends_with("/files/price.PDF"));
    assert_eq!(document.value("result.title"), None);
    assert_eq!(document.status, None);

    // documents are not validated
    let titles = outcome.summary.get("title").map(<[_]>::len).unwrap_or(0);
    assert_eq!(titles, 0);
}

#[tokio::test]
async fn test_max_requests_limit() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (1..=5).map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i)).collect();
    mount_html(
        &server,
        "/",
        format!("<html><head><title>Home</title></head><body>{}</body></html>", links),
    )
    .await;
    for i in 1..=5 {
        mount_html(&server, &format!("/p{}", i), "<html><title>P</title></html>".to_string()).await;
    }

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&format!("{}/", base), &dir);
    config.crawler.max_requests = 3;
    let (pages, events, _, outcome) = run_crawl(&config).await;

    assert_eq!(pages.len(), 3);
    assert_eq!(outcome.requested, 3);
    let reported = events
        .iter()
        .filter(|e| matches!(e, CrawlEvent::MaxRequestReached { limit: 3 }))
        .count();
    assert_eq!(reported, 1);
}

#[tokio::test]
async fn test_url_list_mode() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/a",
        r#"<html><head><title>A</title></head><body><a href="/not-followed">x</a></body></html>"#.to_string(),
    )
    .await;
    mount_html(&server, "/b", "<html><head><title>B</title></head></html>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/not-followed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    // URL-list mode ignores robots.txt
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let list = dir.path().join("urls.txt");
    std::fs::write(
        &list,
        format!("{base}/a\n{base}/b\n{base}/a\n{base}/logo.png\n", base = base),
    )
    .unwrap();

    let mut config = create_test_config(&list.display().to_string(), &dir);
    config.crawler.url_list = true;
    let session = SessionConfig::resolve(&config, 4).unwrap();
    assert_eq!(session.max_depth, 1);
    assert!(!session.limit_domain);

    let (pages, _, _, _) = run_crawl(&config).await;

    assert_eq!(urls(&pages), vec![format!("{}/a", base), format!("{}/b", base)]);
    assert!(pages.iter().all(|p| p.depth == 1));
}

#[tokio::test]
async fn test_invalid_user_agent_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config("http://127.0.0.1:1/", &dir);
    config.crawler.user_agent = "bad\nagent".to_string();
    let session = SessionConfig::resolve(&config, 4).unwrap();

    let renderer = Arc::new(HttpRenderer::new(HttpRendererConfig {
        user_agent: session.user_agent.clone(),
        timeout: session.timeout,
    }));
    let result = CrawlSession::new(session, renderer);

    assert!(result.is_err());
}
