//! Crawl session - main crawl orchestration logic
//!
//! This module contains the session state machine that coordinates all
//! aspects of a crawl, including:
//! - Launching and closing the renderer and auditor
//! - Seeding the frontier from a start URL, a URL list or a sitemap
//! - Running a bounded pool of page visits
//! - Following links within the depth, domain and request limits
//! - Validating and persisting every page result
//! - Handing the tabular output to the finalizer

use crate::audit::Auditor;
use crate::config::SessionConfig;
use crate::crawler::events::{CrawlEvent, EventSink, TracingSink};
use crate::crawler::result::PageResult;
use crate::crawler::scheduler::{Enqueue, Frontier, QueuedUrl};
use crate::crawler::url_list::load_url_list;
use crate::crawler::visitor::PageVisitor;
use crate::output::{ExportArtifacts, Finalizer, PageSink};
use crate::policy::RequestPolicy;
use crate::render::{build_http_client, HttpRendererConfig, RenderError, Renderer};
use crate::robots::{sitemap, RobotsCache};
use crate::state::SessionState;
use crate::url::{decode_url, extract_domain, is_same_domain, normalize_url, protocol_of};
use crate::validate::{ValidationSummary, Validator};
use crate::{Result, SiteAuditError};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// What a finished crawl produced
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Page results written to the sink
    pub pages: usize,
    /// URLs taken from the frontier
    pub requested: usize,
    pub elapsed: Duration,
    pub summary: ValidationSummary,
}

/// One crawl, from launch to export
///
/// The session walks `Init -> Queuing -> Running -> Draining -> Closed ->
/// ExportPending` in [`CrawlSession::run`] and `Finalizing -> Done` in
/// [`CrawlSession::finalize`]. Only a launch failure leads to `Failed`.
pub struct CrawlSession {
    config: Arc<SessionConfig>,
    renderer: Arc<dyn Renderer>,
    auditor: Option<Arc<dyn Auditor>>,
    client: Client,
    sink: Arc<dyn EventSink>,
    state: SessionState,
    started: Instant,
}

impl CrawlSession {
    /// Creates a session in the `Init` state
    ///
    /// The concurrency couplings (delay, audit and screenshot force a single
    /// worker; never more workers than available parallelism) are enforced
    /// here again, so hand-built settings cannot break them.
    ///
    /// # Arguments
    ///
    /// * `config` - The resolved session settings
    /// * `renderer` - Engine used for page visits
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - Session ready to run
    /// * `Err(SiteAuditError)` - The HTTP client for robots/sitemap/list fetches could not be built
    pub fn new(mut config: SessionConfig, renderer: Arc<dyn Renderer>) -> Result<Self> {
        let parallelism = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        config.enforce_concurrency(parallelism);

        let client = build_http_client(&HttpRendererConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
        })?;

        Ok(Self {
            config: Arc::new(config),
            renderer,
            auditor: None,
            client,
            sink: Arc::new(TracingSink),
            state: SessionState::Init,
            started: Instant::now(),
        })
    }

    /// Audits every rendered page with the given auditor
    ///
    /// The auditor must already serialize its calls.
    pub fn with_auditor(mut self, auditor: Arc<dyn Auditor>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    /// Replaces the default log observer
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SiteAuditError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Session state: {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
        Ok(())
    }

    fn emit(&self, event: CrawlEvent) {
        self.sink.emit(&event);
    }

    /// Runs the crawl and writes every page result to `pages`
    ///
    /// Returns once all visits finished and the renderer is closed; the
    /// session is then in `ExportPending`.
    pub async fn run(&mut self, pages: &mut dyn PageSink) -> Result<CrawlOutcome> {
        self.started = Instant::now();

        if let Err(e) = self.launch().await {
            tracing::error!("{}", e);
            self.transition(SessionState::Failed)?;
            return Err(e);
        }

        self.transition(SessionState::Queuing)?;
        let mut frontier = Frontier::new(self.config.max_requests);
        let seeds = self.seed().await;
        let mut limit_reported = false;
        for seed in seeds.iter().cloned() {
            if frontier.push(seed) == Enqueue::LimitReached {
                self.report_limit(&mut limit_reported);
                break;
            }
        }
        tracing::info!("Queued {} URLs", frontier.len());

        let initial_protocol = seeds
            .first()
            .map(|seed| protocol_of(&seed.url))
            .unwrap_or_else(|| "https:".to_string());
        let start_domain = seeds.first().and_then(|seed| extract_domain(&seed.url));
        let policy = Arc::new(RequestPolicy::new(
            &self.config.docs_extensions,
            self.config.skip_static,
            &initial_protocol,
        ));
        let catalog = Arc::new(self.config.catalog.clone());
        let mut visitor = PageVisitor::new(
            Arc::clone(&self.renderer),
            Arc::clone(&policy),
            Arc::clone(&catalog),
            self.config.locale.clone(),
        );
        if let Some(auditor) = &self.auditor {
            visitor = visitor.with_auditor(Arc::clone(auditor));
        }
        let visitor = Arc::new(visitor);

        self.transition(SessionState::Running)?;
        let robots = RobotsCache::new(self.client.clone(), self.config.user_agent.clone());
        let mut validator = Validator::new();
        let mut in_flight: JoinSet<(QueuedUrl, std::result::Result<PageResult, RenderError>)> = JoinSet::new();
        let mut written = 0;

        loop {
            while in_flight.len() < self.config.concurrency {
                let Some(queued) = frontier.pop() else {
                    break;
                };

                if !self.config.ignore_robots_txt && !robots.is_allowed(&queued.url).await {
                    self.emit(CrawlEvent::RequestDisallowed {
                        url: decode_url(queued.url.as_str()),
                    });
                    continue;
                }

                self.emit(CrawlEvent::RequestStarted {
                    url: decode_url(queued.url.as_str()),
                    requested: frontier.requested(),
                    queue_size: frontier.len(),
                });

                let visitor = Arc::clone(&visitor);
                in_flight.spawn(async move {
                    let outcome = visitor.visit(&queued).await;
                    (queued, outcome)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let (queued, outcome) = match joined {
                Ok(joined) => joined,
                Err(e) => {
                    tracing::error!("Page visit task failed: {}", e);
                    continue;
                }
            };

            match outcome {
                Ok(page) => {
                    self.handle_discovered_links(
                        &mut frontier,
                        &policy,
                        start_domain.as_deref(),
                        &queued,
                        &page,
                        &mut limit_reported,
                    );

                    let diagnostics = if page.is_document || page.error.is_some() {
                        Vec::new()
                    } else {
                        validator.check(&page, &catalog)
                    };
                    for diagnostic in &diagnostics {
                        tracing::debug!(
                            "{} {} {}: {}",
                            page.url,
                            diagnostic.severity,
                            diagnostic.field,
                            diagnostic.message
                        );
                    }
                    validator.record(&page.url, &diagnostics);

                    match pages.write(&page) {
                        Ok(()) => written += 1,
                        Err(e) => tracing::error!("Failed to write result for {}: {}", page.url, e),
                    }
                }
                Err(e) => self.emit(CrawlEvent::RequestFailed {
                    url: decode_url(queued.url.as_str()),
                    reason: e.to_string(),
                }),
            }

            if frontier.is_full() && self.state == SessionState::Running {
                self.transition(SessionState::Draining)?;
            }

            if !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay).await;
            }

            if written > 0 && written % 10 == 0 {
                let elapsed = self.started.elapsed();
                tracing::info!(
                    "Progress: {} pages crawled, {} in queue, {:.2} pages/sec",
                    written,
                    frontier.len(),
                    written as f64 / elapsed.as_secs_f64()
                );
            }
        }

        if self.state == SessionState::Running {
            self.transition(SessionState::Draining)?;
        }
        if let Err(e) = pages.flush() {
            tracing::error!("Failed to flush results: {}", e);
        }

        self.transition(SessionState::Closed)?;
        self.renderer.close().await;
        if let Some(auditor) = &self.auditor {
            auditor.close().await;
        }
        self.transition(SessionState::ExportPending)?;

        let elapsed = self.started.elapsed();
        tracing::info!(
            "Crawl completed: {} pages in {:.1}s",
            written,
            elapsed.as_secs_f64()
        );

        Ok(CrawlOutcome {
            pages: written,
            requested: frontier.requested(),
            elapsed,
            summary: validator.summarize(),
        })
    }

    /// Runs the export sequence on the tabular output of [`CrawlSession::run`]
    pub async fn finalize(&mut self, finalizer: &Finalizer, tabular: &Path) -> Result<ExportArtifacts> {
        self.transition(SessionState::Finalizing)?;
        let artifacts = finalizer.finalize(tabular, self.sink.as_ref()).await;
        self.transition(SessionState::Done)?;
        Ok(artifacts)
    }

    /// Starts the renderer and the auditor
    async fn launch(&self) -> Result<()> {
        self.renderer
            .launch()
            .await
            .map_err(|e| SiteAuditError::Launch(e.to_string()))?;

        if let Some(auditor) = &self.auditor {
            if let Err(e) = auditor.open().await {
                self.renderer.close().await;
                return Err(SiteAuditError::Launch(e.to_string()));
            }
        }
        Ok(())
    }

    /// Builds the initial queue entries
    async fn seed(&self) -> Vec<QueuedUrl> {
        let config = &self.config;

        if config.url_list {
            let raw = if config.start_urls.len() > 1 {
                config.start_urls.clone()
            } else if let Some(source) = config.start_urls.first() {
                match load_url_list(&self.client, source).await {
                    Ok(urls) => urls,
                    Err(e) => {
                        self.emit(CrawlEvent::Status(format!("Failed to load URL list {}: {}", source, e)));
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };
            return parse_seeds(&raw, 1);
        }

        let mut seeds = parse_seeds(&config.start_urls[..config.start_urls.len().min(1)], 0);

        if config.follow_xml_sitemap {
            if let Some(start) = seeds.first().map(|seed| seed.url.clone()) {
                let origin = start.origin().ascii_serialization();
                let robots = RobotsCache::new(self.client.clone(), config.user_agent.clone());
                let locations = crate::robots::sitemap_locations(&robots.robots_for(&start).await, &origin);
                let urls = sitemap::fetch_sitemap_urls(&self.client, &locations).await;
                let host = start.host_str().unwrap_or_default().to_string();
                seeds.extend(
                    parse_seeds(&urls, 1)
                        .into_iter()
                        .filter(|seed| seed.url.host_str() == Some(host.as_str())),
                );
            }
        }

        seeds
    }

    fn report_limit(&self, reported: &mut bool) {
        if !*reported {
            *reported = true;
            self.emit(CrawlEvent::MaxRequestReached {
                limit: self.config.max_requests,
            });
        }
    }

    /// Queues the links of a finished page
    ///
    /// This method:
    /// 1. Stops at the depth limit
    /// 2. Normalizes URLs
    /// 3. Drops URLs the request policy does not navigate to
    /// 4. Applies the domain restriction
    /// 5. Adds the rest to the frontier
    fn handle_discovered_links(
        &self,
        frontier: &mut Frontier,
        policy: &RequestPolicy,
        start_domain: Option<&str>,
        queued: &QueuedUrl,
        page: &PageResult,
        limit_reported: &mut bool,
    ) {
        if page.links.is_empty() {
            return;
        }

        let depth = queued.depth + 1;
        if depth > self.config.max_depth {
            self.emit(CrawlEvent::MaxDepthReached {
                url: page.url.clone(),
                depth: queued.depth,
            });
            return;
        }

        for link in &page.links {
            let normalized = match normalize_url(link) {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!("Failed to normalize URL {}: {}", link, e);
                    continue;
                }
            };

            if !policy.admit_navigation(normalized.as_str()) {
                tracing::debug!("Not following {}", normalized);
                continue;
            }

            if self.config.limit_domain {
                match start_domain {
                    Some(domain) if is_same_domain(&normalized, domain) => {}
                    _ => continue,
                }
            }

            let item = QueuedUrl {
                url: normalized,
                depth,
                previous_url: Some(page.url.clone()),
            };
            if frontier.push(item) == Enqueue::LimitReached {
                self.report_limit(limit_reported);
                break;
            }
        }
    }
}

/// Normalizes raw seed URLs, logging and skipping invalid ones
fn parse_seeds(raw: &[String], depth: u32) -> Vec<QueuedUrl> {
    raw.iter()
        .filter_map(|url| match normalize_url(url) {
            Ok(url) => Some(QueuedUrl::seed(url, depth)),
            Err(e) => {
                tracing::warn!("Skipping invalid URL {}: {}", url, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crawler::events::ChannelSink;
    use crate::output::MemorySink;
    use crate::render::{RenderedPage, RequestFilter};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use url::Url;

    /// In-memory site: path -> list of linked paths
    struct ScriptedRenderer {
        pages: HashMap<String, Vec<String>>,
        fail_launch: bool,
        running: AtomicUsize,
        peak: AtomicUsize,
        closed: AtomicBool,
    }

    impl ScriptedRenderer {
        fn new(pages: &[(&str, &[&str])]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, links)| (url.to_string(), links.iter().map(|l| l.to_string()).collect()))
                    .collect(),
                fail_launch: false,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn launch(&self) -> std::result::Result<(), RenderError> {
            if self.fail_launch {
                return Err(RenderError::Launch("no browser".to_string()));
            }
            Ok(())
        }

        async fn render(
            &self,
            url: &Url,
            _filter: RequestFilter<'_>,
        ) -> std::result::Result<RenderedPage, RenderError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let links = self.pages.get(url.as_str()).ok_or_else(|| RenderError::Navigation {
                url: url.to_string(),
                reason: "404".to_string(),
            })?;
            Ok(RenderedPage {
                final_url: url.clone(),
                status: 200,
                content_type: Some("text/html".to_string()),
                html: "<html><head><title>Page</title></head><body><h1>x</h1></body></html>".to_string(),
                request_time_ms: 1,
                links: links.clone(),
                blocked: Vec::new(),
            })
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn session_config(dir: &TempDir, start: &str) -> SessionConfig {
        let mut config = Config::default();
        config.crawler.urls = vec![start.to_string()];
        config.crawler.ignore_robots_txt = true;
        config.crawler.concurrency = Some(4);
        config.output.out_dir = dir.path().display().to_string();
        SessionConfig::resolve(&config, 4).unwrap()
    }

    fn site() -> ScriptedRenderer {
        ScriptedRenderer::new(&[
            ("https://example.com/", &["https://example.com/a", "https://example.com/b", "https://other.com/"]),
            ("https://example.com/a", &["https://example.com/c", "https://example.com/"]),
            ("https://example.com/b", &["https://example.com/a#top"]),
            ("https://example.com/c", &[]),
        ])
    }

    #[tokio::test]
    async fn test_crawl_follows_links_within_domain() {
        let dir = TempDir::new().unwrap();
        let renderer = Arc::new(site());
        let mut session = CrawlSession::new(session_config(&dir, "https://example.com/"), renderer.clone()).unwrap();
        let mut sink = MemorySink::default();

        let outcome = session.run(&mut sink).await.unwrap();

        let mut urls: Vec<_> = sink.pages().iter().map(|p| p.url.clone()).collect();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://example.com/",
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c",
            ]
        );
        assert_eq!(outcome.pages, 4);
        assert_eq!(session.state(), SessionState::ExportPending);
        assert!(renderer.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_max_depth_limits_expansion() {
        let dir = TempDir::new().unwrap();
        let mut config = session_config(&dir, "https://example.com/");
        config.max_depth = 1;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = CrawlSession::new(config, Arc::new(site()))
            .unwrap()
            .with_sink(Arc::new(ChannelSink::new(tx)));
        let mut sink = MemorySink::default();

        session.run(&mut sink).await.unwrap();

        assert_eq!(sink.pages().len(), 3);
        assert!(sink.pages().iter().all(|p| p.url != "https://example.com/c"));

        let mut depth_events = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, CrawlEvent::MaxDepthReached { .. }) {
                depth_events += 1;
            }
        }
        assert_eq!(depth_events, 2);
    }

    #[tokio::test]
    async fn test_max_requests_stops_enqueueing() {
        let dir = TempDir::new().unwrap();
        let mut config = session_config(&dir, "https://example.com/");
        config.max_requests = 2;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = CrawlSession::new(config, Arc::new(site()))
            .unwrap()
            .with_sink(Arc::new(ChannelSink::new(tx)));
        let mut sink = MemorySink::default();

        let outcome = session.run(&mut sink).await.unwrap();
        assert_eq!(outcome.requested, 2);
        assert_eq!(sink.pages().len(), 2);

        let mut limit_events = 0;
        while let Ok(event) = rx.try_recv() {
            if event == (CrawlEvent::MaxRequestReached { limit: 2 }) {
                limit_events += 1;
            }
        }
        assert_eq!(limit_events, 1);
    }

    #[tokio::test]
    async fn test_concurrency_bound_is_respected() {
        let dir = TempDir::new().unwrap();
        let mut config = session_config(&dir, "https://example.com/");
        config.concurrency = 2;
        let renderer = Arc::new(site());
        let mut session = CrawlSession::new(config, renderer.clone()).unwrap();

        session.run(&mut MemorySink::default()).await.unwrap();
        assert!(renderer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_delay_forces_single_worker() {
        let dir = TempDir::new().unwrap();
        let mut config = session_config(&dir, "https://example.com/");
        config.delay = Duration::from_millis(20);
        config.concurrency = 4;
        let renderer = Arc::new(site());
        let mut session = CrawlSession::new(config, renderer.clone()).unwrap();

        session.run(&mut MemorySink::default()).await.unwrap();
        assert_eq!(renderer.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let renderer = ScriptedRenderer::new(&[("https://example.com/", &["https://example.com/missing"])]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = CrawlSession::new(session_config(&dir, "https://example.com/"), Arc::new(renderer))
            .unwrap()
            .with_sink(Arc::new(ChannelSink::new(tx)));
        let mut sink = MemorySink::default();

        session.run(&mut sink).await.unwrap();
        assert_eq!(sink.pages().len(), 1);

        let failed: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| matches!(e, CrawlEvent::RequestFailed { .. }))
            .collect();
        assert_eq!(failed.len(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_fails_session() {
        let dir = TempDir::new().unwrap();
        let mut renderer = site();
        renderer.fail_launch = true;
        let mut session = CrawlSession::new(session_config(&dir, "https://example.com/"), Arc::new(renderer)).unwrap();

        let result = session.run(&mut MemorySink::default()).await;
        assert!(matches!(result, Err(SiteAuditError::Launch(_))));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_finalize_requires_finished_crawl() {
        let dir = TempDir::new().unwrap();
        let config = session_config(&dir, "https://example.com/");
        let finalizer = Finalizer::new(&config).unwrap();
        let mut session = CrawlSession::new(config, Arc::new(site())).unwrap();

        let result = session.finalize(&finalizer, &dir.path().join("x.csv")).await;
        assert!(matches!(result, Err(SiteAuditError::InvalidTransition { .. })));
    }
}
