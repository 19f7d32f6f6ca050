//! Site-Audit main entry point
//!
//! This is the command-line interface for the Site-Audit SEO crawler.

use anyhow::{bail, Context};
use clap::Parser;
use site_audit::audit::{LighthouseAuditor, LighthouseConfig, SerializedAuditor};
use site_audit::config::{load_config_with_hash, validate, Config};
use site_audit::crawler::TracingSink;
use site_audit::output::{format_finish_line, format_validation_summary, CsvSink, ExportArtifacts, Finalizer};
use site_audit::render::{HttpRenderer, HttpRendererConfig};
use site_audit::{CrawlSession, SessionConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Site-Audit: an SEO site crawler
///
/// Crawls a site (or a list of URLs), extracts SEO fields from every page,
/// validates them and writes a csv table plus optional xlsx and JSON reports.
#[derive(Parser, Debug)]
#[command(name = "site-audit")]
#[command(version)]
#[command(about = "SEO site audit crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start URL(s); more than one switches to URL-list mode
    #[arg(short, long, value_delimiter = ',')]
    urls: Vec<String>,

    /// Field preset
    #[arg(short, long)]
    preset: Option<String>,

    /// Field names to exclude from the preset
    #[arg(short, long, value_delimiter = ',')]
    exclude: Vec<String>,

    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Parallel page visits
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Run a Lighthouse audit for every page
    #[arg(long)]
    lighthouse: bool,

    /// Pause after each page (milliseconds)
    #[arg(long)]
    delay: Option<u64>,

    /// Custom field, `name=expression` (repeatable)
    #[arg(short = 'f', long = "field", value_name = "NAME=EXPR")]
    fields: Vec<String>,

    /// Load images, stylesheets and scripts
    #[arg(long)]
    no_skip_static: bool,

    /// Follow links to other hosts
    #[arg(long)]
    no_limit_domain: bool,

    /// Comma separated document extensions
    #[arg(long, value_delimiter = ',')]
    docs_extensions: Vec<String>,

    #[arg(long)]
    follow_xml_sitemap: bool,

    #[arg(long)]
    ignore_robots_txt: bool,

    /// Treat the URL as a list of URLs to scan
    #[arg(long)]
    url_list: bool,

    /// Stop after this many pages
    #[arg(short, long)]
    max_requests: Option<usize>,

    /// Page request timeout (milliseconds)
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    out_dir: Option<String>,

    #[arg(long)]
    out_name: Option<String>,

    /// Also write an xlsx spreadsheet
    #[arg(long)]
    xlsx: bool,

    /// Do not write the JSON report
    #[arg(long)]
    no_json: bool,

    /// Upload the JSON report
    #[arg(long)]
    upload: bool,

    /// Report language (en, fr, de, ru)
    #[arg(long)]
    lang: Option<String>,

    /// Filter applied when the report is opened, e.g. `depth>1`
    #[arg(long)]
    default_filter: Option<String>,

    /// Capture a screenshot of every page
    #[arg(long)]
    screenshot: bool,

    /// Skip the crawl and convert an existing csv file
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Print the resolved session settings and exit
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Layers the command-line flags over the file configuration
    fn apply(&self, config: &mut Config) {
        let crawler = &mut config.crawler;
        if !self.urls.is_empty() {
            crawler.urls = self.urls.clone();
        }
        if let Some(depth) = self.max_depth {
            crawler.max_depth = depth;
        }
        if self.concurrency.is_some() {
            crawler.concurrency = self.concurrency;
        }
        if let Some(delay) = self.delay {
            crawler.delay = delay;
        }
        if let Some(max) = self.max_requests {
            crawler.max_requests = max;
        }
        if let Some(timeout) = self.timeout {
            crawler.timeout = timeout;
        }
        if !self.docs_extensions.is_empty() {
            crawler.docs_extensions = self.docs_extensions.clone();
        }
        crawler.skip_static &= !self.no_skip_static;
        crawler.limit_domain &= !self.no_limit_domain;
        crawler.follow_xml_sitemap |= self.follow_xml_sitemap;
        crawler.ignore_robots_txt |= self.ignore_robots_txt;
        crawler.url_list |= self.url_list;

        let fields = &mut config.fields;
        if let Some(preset) = &self.preset {
            fields.preset = preset.clone();
        }
        fields.exclude.extend(self.exclude.iter().cloned());
        fields.custom.extend(self.fields.iter().cloned());
        if let Some(filter) = &self.default_filter {
            fields.default_filter = filter.clone();
        }

        config.audit.lighthouse |= self.lighthouse;
        config.audit.screenshot |= self.screenshot;
        if self.lang.is_some() {
            config.audit.lang = self.lang.clone();
        }

        let output = &mut config.output;
        if let Some(dir) = &self.out_dir {
            output.out_dir = dir.clone();
        }
        if self.out_name.is_some() {
            output.out_name = self.out_name.clone();
        }
        output.xlsx |= self.xlsx;
        output.json &= !self.no_json;
        output.upload |= self.upload;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::debug!("Configuration loaded (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };
    cli.apply(&mut config);
    validate(&config).context("Invalid configuration")?;

    let parallelism = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let mut session = SessionConfig::resolve(&config, parallelism)?;
    session.config_hash = config_hash;

    if cli.dry_run {
        println!("{}", session.brief());
        return Ok(());
    }

    if let Some(csv) = &cli.csv {
        return handle_convert(&session, csv).await;
    }

    handle_crawl(session, &config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_audit=info,warn"),
            1 => EnvFilter::new("site_audit=debug,info"),
            2 => EnvFilter::new("site_audit=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles `--csv`: converts an existing tabular file without crawling
async fn handle_convert(session: &SessionConfig, csv: &Path) -> anyhow::Result<()> {
    if !csv.is_file() {
        bail!("{} is not a file", csv.display());
    }

    let finalizer = Finalizer::new(session)?.preserve_tabular();
    let sink = TracingSink;
    let artifacts = finalizer.finalize(csv, &sink).await;
    check_artifacts(session, &artifacts)
}

/// Handles the crawl followed by the export sequence
async fn handle_crawl(session: SessionConfig, config: &Config) -> anyhow::Result<()> {
    if session.start_urls.is_empty() {
        bail!("No start URL given (use --urls or [crawler] urls)");
    }

    println!("{}\n", session.brief());

    let finalizer = Finalizer::new(&session)?;
    let tabular = finalizer.paths().tabular;
    let mut pages = CsvSink::create(&tabular, &session.catalog)
        .with_context(|| format!("Failed to create {}", tabular.display()))?;

    let renderer = Arc::new(HttpRenderer::new(HttpRendererConfig {
        user_agent: session.user_agent.clone(),
        timeout: session.timeout,
    }));
    let audit_enabled = session.audit_enabled;
    let settings = session.clone();

    let mut crawl = CrawlSession::new(session, renderer)?;
    if audit_enabled {
        let lighthouse = LighthouseAuditor::new(LighthouseConfig {
            chrome_path: config.audit.chrome_path.clone(),
            lighthouse_path: config.audit.lighthouse_path.clone(),
            port: config.audit.port,
            headless: config.audit.headless,
            ..Default::default()
        });
        crawl = crawl.with_auditor(Arc::new(SerializedAuditor::new(lighthouse)));
    }

    let outcome = crawl.run(&mut pages).await?;
    println!("\n{}", format_validation_summary(&outcome.summary));

    let artifacts = crawl.finalize(&finalizer, &tabular).await?;
    println!("{}", format_finish_line(outcome.elapsed, outcome.pages));

    check_artifacts(&settings, &artifacts)
}

/// One-shot runs fail when an export step failed; served runs only report
fn check_artifacts(session: &SessionConfig, artifacts: &ExportArtifacts) -> anyhow::Result<()> {
    if artifacts.is_success() || session.output.served {
        return Ok(());
    }

    let steps: Vec<&str> = artifacts.failures.iter().map(|f| f.step.as_str()).collect();
    bail!("Export failed: {}", steps.join(", "))
}
