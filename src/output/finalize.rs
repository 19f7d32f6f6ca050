//! Export sequence run after the crawl
//!
//! The tabular file is converted into the requested derived formats, the
//! structured report is published (upload, served reports directory,
//! time-series export) and intermediate files are cleaned up.
//!
//! Conversions that fail because the target is busy or locked are retried a
//! bounded number of times. Every other failure is recorded for its own
//! artifact only; nothing here aborts the sequence.

use crate::config::{sanitize_file_name, InfluxConfig, OutputSettings, SessionConfig};
use crate::crawler::{CrawlEvent, EventSink};
use crate::output::csv_sink::read_table;
use crate::output::influx::InfluxExporter;
use crate::output::report::{build_report, read_report, write_report, ReportMeta};
use crate::output::traits::OutputError;
use crate::output::upload::{HttpUploader, Uploader};
use crate::output::xlsx::write_xlsx;
use crate::render::{build_http_client, HttpRendererConfig};
use chrono::{DateTime, Local};
use reqwest::Client;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by export steps
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0} is busy or locked")]
    Busy(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Spreadsheet error: {0}")]
    Xlsx(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("InfluxDB export failed: {0}")]
    Influx(String),

    #[error("Missing input file {0}")]
    MissingInput(PathBuf),

    #[error("Export task failed: {0}")]
    Task(String),
}

impl ExportError {
    /// True for lock contention, the only condition worth retrying
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Busy(_) => true,
            Self::Io { source, .. } => is_busy_io(source),
            Self::Output(OutputError::Io(source)) => is_busy_io(source),
            _ => false,
        }
    }
}

/// EBUSY on unix, sharing/lock violation on Windows
fn is_busy_io(error: &io::Error) -> bool {
    match error.raw_os_error() {
        #[cfg(unix)]
        Some(16) => true,
        #[cfg(windows)]
        Some(32) | Some(33) => true,
        _ => false,
    }
}

/// Bounded retry for busy conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            backoff: Duration::from_secs(10),
        }
    }
}

/// Runs `op`, retrying while it fails with a busy error
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, step: &str, mut op: F) -> Result<T, ExportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExportError>>,
{
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_busy() && retries < policy.retries => {
                retries += 1;
                tracing::warn!(
                    "{}: {}, retry {}/{} in {:?}",
                    step,
                    e,
                    retries,
                    policy.retries,
                    policy.backoff
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Converts the tabular file into a derived format
pub trait Converter: Send + Sync {
    fn convert(&self, tabular: &Path, target: &Path) -> Result<(), ExportError>;
}

/// Tabular file -> spreadsheet
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxConverter;

impl Converter for XlsxConverter {
    fn convert(&self, tabular: &Path, target: &Path) -> Result<(), ExportError> {
        let table = read_table(tabular)?;
        write_xlsx(&table, target)
    }
}

/// Tabular file -> structured JSON report
#[derive(Debug, Clone)]
pub struct JsonReportConverter {
    meta: ReportMeta,
}

impl JsonReportConverter {
    pub fn new(meta: ReportMeta) -> Self {
        Self { meta }
    }
}

impl Converter for JsonReportConverter {
    fn convert(&self, tabular: &Path, target: &Path) -> Result<(), ExportError> {
        let table = read_table(tabular)?;
        write_report(&build_report(&table, &self.meta), target)?;
        Ok(())
    }
}

/// File locations of one session's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub tabular: PathBuf,
    pub spreadsheet: PathBuf,
    pub report: PathBuf,
}

impl OutputPaths {
    pub fn new(out_dir: &Path, name: &str) -> Self {
        // names are usually hosts, so the extension is appended, never swapped
        let name = sanitize_file_name(name);
        Self {
            tabular: out_dir.join(format!("{}.csv", name)),
            spreadsheet: out_dir.join(format!("{}.xlsx", name)),
            report: out_dir.join(format!("{}.json", name)),
        }
    }

    /// Derived paths next to an existing tabular file
    pub fn beside(tabular: &Path) -> Self {
        Self {
            tabular: tabular.to_path_buf(),
            spreadsheet: tabular.with_extension("xlsx"),
            report: tabular.with_extension("json"),
        }
    }
}

/// A failed export step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    pub step: String,
    pub message: String,
}

/// What the export sequence produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportArtifacts {
    pub tabular: PathBuf,
    pub spreadsheet: Option<PathBuf>,
    pub report: Option<PathBuf>,
    /// Copy of the report in the served reports directory
    pub published: Option<PathBuf>,
    pub web_url: Option<String>,
    pub influx_points: usize,
    /// Intermediate files deleted during cleanup
    pub removed: Vec<PathBuf>,
    pub failures: Vec<ExportFailure>,
}

impl ExportArtifacts {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the export sequence for a finished crawl
pub struct Finalizer {
    output: OutputSettings,
    influx: InfluxConfig,
    spreadsheet: Option<Arc<dyn Converter>>,
    report: Option<Arc<dyn Converter>>,
    uploader: Option<Arc<dyn Uploader>>,
    client: Client,
    owns_tabular: bool,
}

impl Finalizer {
    /// Finalizer for the formats requested by the session settings
    ///
    /// Fails when the HTTP client for upload and InfluxDB cannot be built.
    pub fn new(config: &SessionConfig) -> crate::Result<Self> {
        let output = config.output.clone();
        let client = build_http_client(&HttpRendererConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
        })?;

        let spreadsheet: Option<Arc<dyn Converter>> =
            output.xlsx.then(|| Arc::new(XlsxConverter) as Arc<dyn Converter>);
        let report: Option<Arc<dyn Converter>> = output.json.then(|| {
            Arc::new(JsonReportConverter::new(ReportMeta {
                lang: config.locale.clone(),
                preset: config.catalog.preset().to_string(),
                default_filter: config.default_filter.clone(),
                config_hash: config.config_hash.clone(),
            })) as Arc<dyn Converter>
        });
        let uploader: Option<Arc<dyn Uploader>> = match (output.upload, &output.upload_url) {
            (true, Some(url)) => Some(Arc::new(HttpUploader::new(client.clone(), url.clone()))),
            _ => None,
        };

        Ok(Self {
            output,
            influx: config.influx.clone(),
            spreadsheet,
            report,
            uploader,
            client,
            owns_tabular: true,
        })
    }

    pub fn with_spreadsheet_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.spreadsheet = Some(converter);
        self
    }

    pub fn with_report_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.report = Some(converter);
        self
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// The tabular file was supplied by the user; never delete it
    pub fn preserve_tabular(mut self) -> Self {
        self.owns_tabular = false;
        self
    }

    /// Where the session should write its tabular file
    pub fn paths(&self) -> OutputPaths {
        OutputPaths::new(&self.output.out_dir, &self.output.out_name)
    }

    /// Runs every export step on `tabular`
    ///
    /// Failures are collected in the returned artifacts and, for the
    /// best-effort publishing steps, emitted as `ExportFailed` events.
    pub async fn finalize(&self, tabular: &Path, events: &dyn EventSink) -> ExportArtifacts {
        let paths = OutputPaths::beside(tabular);
        let mut artifacts = ExportArtifacts {
            tabular: tabular.to_path_buf(),
            ..Default::default()
        };

        if !tabular.is_file() {
            fail(&mut artifacts, events, "csv", &ExportError::MissingInput(tabular.to_path_buf()));
            return artifacts;
        }

        if let Some(converter) = &self.spreadsheet {
            match self.convert(converter, "xlsx", tabular, &paths.spreadsheet).await {
                Ok(()) => artifacts.spreadsheet = Some(paths.spreadsheet.clone()),
                Err(e) => fail(&mut artifacts, events, "xlsx", &e),
            }
        }

        if let Some(converter) = &self.report {
            match self.convert(converter, "json", tabular, &paths.report).await {
                Ok(()) => artifacts.report = Some(paths.report.clone()),
                Err(e) => fail(&mut artifacts, events, "json", &e),
            }
        }

        if let Some(report) = artifacts.report.clone() {
            self.publish(&report, &mut artifacts, events).await;
        }

        let local = artifacts.report.clone().or_else(|| artifacts.spreadsheet.clone());
        if !self.output.served && (local.is_some() || artifacts.web_url.is_some()) {
            events.emit(&CrawlEvent::Result {
                local_path: local,
                web_url: artifacts.web_url.clone(),
            });
        }

        self.cleanup(&paths, &mut artifacts);
        artifacts
    }

    /// Runs a conversion on the blocking pool, retrying busy targets
    async fn convert(
        &self,
        converter: &Arc<dyn Converter>,
        step: &str,
        tabular: &Path,
        target: &Path,
    ) -> Result<(), ExportError> {
        with_retry(self.output.retry, step, || {
            let converter = Arc::clone(converter);
            let tabular = tabular.to_path_buf();
            let target = target.to_path_buf();
            async move {
                tokio::task::spawn_blocking(move || converter.convert(&tabular, &target))
                    .await
                    .map_err(|e| ExportError::Task(e.to_string()))?
            }
        })
        .await?;
        tracing::info!("Saved {}", target.display());
        Ok(())
    }

    /// Served copy, time-series export and upload of the JSON report
    async fn publish(&self, report: &Path, artifacts: &mut ExportArtifacts, events: &dyn EventSink) {
        if self.output.served {
            let client_dir = self.output.client_id.as_deref().map(client_subdir);
            let dir = match &client_dir {
                Some(sub) => self.output.reports_dir.join(sub),
                None => self.output.reports_dir.clone(),
            };
            match publish_copy(report, &dir, &self.output.out_name, Local::now()) {
                Ok(published) => {
                    events.emit(&CrawlEvent::Result {
                        local_path: Some(published.clone()),
                        web_url: None,
                    });
                    artifacts.published = Some(published);
                }
                Err(e) => fail(artifacts, events, "publish", &e),
            }
        }

        if self.influx.enabled {
            let exporter = InfluxExporter::new(self.client.clone(), self.influx.clone());
            let sent = match read_report(report) {
                Ok(parsed) => exporter.export(&parsed).await,
                Err(e) => Err(e.into()),
            };
            match sent {
                Ok(points) => artifacts.influx_points = points,
                Err(e) => fail(artifacts, events, "influxdb", &e),
            }
        }

        if let Some(uploader) = &self.uploader {
            match uploader.upload(report).await {
                Ok(url) => {
                    tracing::info!("Uploaded report: {}", url);
                    if self.output.served {
                        events.emit(&CrawlEvent::Result {
                            local_path: None,
                            web_url: Some(url.clone()),
                        });
                    }
                    artifacts.web_url = Some(url);
                }
                Err(e) => fail(artifacts, events, "upload", &e),
            }
        }
    }

    /// Removes intermediate files whose dependent artifacts exist
    fn cleanup(&self, paths: &OutputPaths, artifacts: &mut ExportArtifacts) {
        // The json is an intermediate only once it was published somewhere else
        let report_published = artifacts.web_url.is_some() || artifacts.published.is_some();
        if self.output.remove_json && report_published {
            if let Some(report) = artifacts.report.clone() {
                remove(&report, artifacts);
            }
        }

        let derived_requested = self.spreadsheet.is_some() || self.report.is_some();
        let derived_done = (self.spreadsheet.is_none() || artifacts.spreadsheet.is_some())
            && (self.report.is_none() || artifacts.report.is_some());
        if self.output.remove_csv && self.owns_tabular && derived_requested && derived_done {
            remove(&paths.tabular, artifacts);
        }
    }
}

fn remove(path: &Path, artifacts: &mut ExportArtifacts) {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed {}", path.display());
            artifacts.removed.push(path.to_path_buf());
        }
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

fn fail(artifacts: &mut ExportArtifacts, events: &dyn EventSink, step: &str, error: &ExportError) {
    tracing::error!("{} failed: {}", step, error);
    events.emit(&CrawlEvent::ExportFailed {
        step: step.to_string(),
        reason: error.to_string(),
    });
    artifacts.failures.push(ExportFailure {
        step: step.to_string(),
        message: error.to_string(),
    });
}

/// Per-client directory: the first five characters of the id, made file-safe
pub fn client_subdir(client_id: &str) -> String {
    sanitize_file_name(&client_id.chars().take(5).collect::<String>())
}

/// Timestamped report name, e.g. `2024-05-01__13-45-10__example.com.json`,
/// or `2024-05-01__13-45-10.123__example.com.json` with milliseconds
pub fn published_name(now: DateTime<Local>, name: &str, with_millis: bool) -> String {
    let stamp = if with_millis {
        now.format("%Y-%m-%d__%H-%M-%S%.3f")
    } else {
        now.format("%Y-%m-%d__%H-%M-%S")
    };
    format!("{}__{}.json", stamp, sanitize_file_name(name))
}

/// Copies the report into the reports directory under a timestamped name
///
/// Falls back to the millisecond form when the short name is taken.
pub fn publish_copy(report: &Path, dir: &Path, name: &str, now: DateTime<Local>) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut target = dir.join(published_name(now, name, false));
    if target.exists() {
        target = dir.join(published_name(now, name, true));
    }
    std::fs::copy(report, &target).map_err(|source| ExportError::Io {
        path: target.clone(),
        source,
    })?;
    tracing::info!("Published report to {}", target.display());
    Ok(target)
}
