//! Integration tests for the export sequence
//!
//! These tests run the finalizer on real tabular files in temporary output
//! directories, with wiremock standing in for the upload endpoint.

use site_audit::config::Config;
use site_audit::crawler::{ChannelSink, CrawlEvent, PageResult, QueuedUrl};
use site_audit::output::{
    read_report, Converter, CsvSink, ExportError, Finalizer, PageSink, RetryPolicy,
};
use site_audit::{FieldValue, SessionConfig};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NO_WAIT: RetryPolicy = RetryPolicy {
    retries: 5,
    backoff: Duration::ZERO,
};

fn session_in(dir: &TempDir, edit: impl FnOnce(&mut Config)) -> SessionConfig {
    let mut config = Config::default();
    config.crawler.urls = vec!["https://example.com/".to_string()];
    config.output.out_dir = dir.path().display().to_string();
    config.output.retry_backoff = 0;
    edit(&mut config);
    SessionConfig::resolve(&config, 4).expect("Failed to resolve session")
}

/// Writes a two-row tabular file for the session catalog
fn write_tabular(session: &SessionConfig, path: &Path) {
    let mut sink = CsvSink::create(path, &session.catalog).unwrap();
    for (i, title) in ["Home", "About"].iter().enumerate() {
        let url = url::Url::parse(&format!("https://example.com/{}", i)).unwrap();
        let mut page = PageResult::document(&QueuedUrl::seed(url, 0));
        let mut fields = page.fields.clone();
        fields.insert("result.title".to_string(), FieldValue::from(*title));
        page.set_fields(fields);
        sink.write(&page).unwrap();
    }
    sink.flush().unwrap();
}

/// Fails with a busy error a fixed number of times, then writes the target
struct FlakyConverter {
    busy_failures: u32,
    calls: Arc<AtomicU32>,
}

impl Converter for FlakyConverter {
    fn convert(&self, _tabular: &Path, target: &Path) -> Result<(), ExportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.busy_failures {
            return Err(ExportError::Busy(target.to_path_buf()));
        }
        std::fs::write(target, b"xlsx").map_err(|source| ExportError::Io {
            path: target.to_path_buf(),
            source,
        })
    }
}

fn flaky(busy_failures: u32) -> (Arc<dyn Converter>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let converter = FlakyConverter {
        busy_failures,
        calls: Arc::clone(&calls),
    };
    (Arc::new(converter), calls)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<CrawlEvent>) -> Vec<CrawlEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_json_report_and_csv_cleanup() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, |_| {});
    let finalizer = Finalizer::new(&session).unwrap();
    let tabular = finalizer.paths().tabular;
    write_tabular(&session, &tabular);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let artifacts = finalizer.finalize(&tabular, &ChannelSink::new(tx)).await;

    assert!(artifacts.is_success());
    let report_path = artifacts.report.clone().expect("json report");
    let report = read_report(&report_path).unwrap();
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.items[1].get("result.title"), Some(&FieldValue::from("About")));
    assert_eq!(report.params.preset, session.catalog.preset());

    // every requested format exists, so the intermediate csv goes
    assert!(!tabular.exists());
    assert_eq!(artifacts.removed, vec![tabular.clone()]);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::Result { local_path: Some(p), .. } if *p == report_path
    )));
}

#[tokio::test]
async fn test_busy_conversion_is_retried() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, |c| c.output.xlsx = true);
    let (converter, calls) = flaky(4);
    let finalizer = Finalizer::new(&session).unwrap().with_spreadsheet_converter(converter);
    let tabular = finalizer.paths().tabular;
    write_tabular(&session, &tabular);

    let (tx, _rx) = mpsc::unbounded_channel();
    let artifacts = finalizer.finalize(&tabular, &ChannelSink::new(tx)).await;

    assert!(artifacts.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert!(artifacts.spreadsheet.as_deref().is_some_and(Path::is_file));
    assert!(!tabular.exists());
}

#[tokio::test]
async fn test_retries_exhausted_keeps_tabular() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, |c| c.output.xlsx = true);
    assert_eq!(session.output.retry, NO_WAIT);
    let (converter, calls) = flaky(u32::MAX);
    let finalizer = Finalizer::new(&session).unwrap().with_spreadsheet_converter(converter);
    let tabular = finalizer.paths().tabular;
    write_tabular(&session, &tabular);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let artifacts = finalizer.finalize(&tabular, &ChannelSink::new(tx)).await;

    // one attempt plus five retries
    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert!(!artifacts.is_success());
    assert_eq!(artifacts.failures[0].step, "xlsx");
    assert!(artifacts.spreadsheet.is_none());
    // the json report still succeeded but the csv is kept for another try
    assert!(artifacts.report.is_some());
    assert!(tabular.exists());

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, CrawlEvent::ExportFailed { step, .. } if step == "xlsx")));
}

#[tokio::test]
async fn test_user_supplied_csv_is_preserved() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, |c| c.output.xlsx = true);
    let tabular = dir.path().join("export.csv");
    write_tabular(&session, &tabular);

    let finalizer = Finalizer::new(&session).unwrap().preserve_tabular();
    let (tx, _rx) = mpsc::unbounded_channel();
    let artifacts = finalizer.finalize(&tabular, &ChannelSink::new(tx)).await;

    assert!(artifacts.is_success());
    assert_eq!(artifacts.spreadsheet, Some(dir.path().join("export.xlsx")));
    assert_eq!(artifacts.report, Some(dir.path().join("export.json")));
    assert!(tabular.exists());
}

#[tokio::test]
async fn test_missing_tabular_file() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, |_| {});
    let finalizer = Finalizer::new(&session).unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let artifacts = finalizer
        .finalize(&dir.path().join("nothing.csv"), &ChannelSink::new(tx))
        .await;

    assert!(!artifacts.is_success());
    assert!(artifacts.report.is_none());
}

#[tokio::test]
async fn test_upload_then_remove_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://viewer.example.com/r/42"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, |c| {
        c.output.json = false;
        c.output.upload = true;
        c.output.upload_url = Some(format!("{}/reports", server.uri()));
        c.output.remove_json = true;
    });
    // upload needs the json report
    assert!(session.output.json);

    let finalizer = Finalizer::new(&session).unwrap();
    let tabular = finalizer.paths().tabular;
    write_tabular(&session, &tabular);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let artifacts = finalizer.finalize(&tabular, &ChannelSink::new(tx)).await;

    assert!(artifacts.is_success());
    assert_eq!(artifacts.web_url.as_deref(), Some("https://viewer.example.com/r/42"));
    let report = artifacts.report.clone().unwrap();
    assert!(!report.exists());
    assert!(artifacts.removed.contains(&report));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::Result { web_url: Some(url), .. } if url == "https://viewer.example.com/r/42"
    )));
}

#[tokio::test]
async fn test_failed_upload_keeps_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, |c| {
        c.output.upload = true;
        c.output.upload_url = Some(server.uri());
        c.output.remove_json = true;
    });
    let finalizer = Finalizer::new(&session).unwrap();
    let tabular = finalizer.paths().tabular;
    write_tabular(&session, &tabular);

    let (tx, _rx) = mpsc::unbounded_channel();
    let artifacts = finalizer.finalize(&tabular, &ChannelSink::new(tx)).await;

    assert_eq!(artifacts.failures.len(), 1);
    assert_eq!(artifacts.failures[0].step, "upload");
    assert!(artifacts.report.as_deref().is_some_and(Path::exists));
}

#[tokio::test]
async fn test_served_mode_publishes_report() {
    let dir = TempDir::new().unwrap();
    let reports: PathBuf = dir.path().join("reports");
    let session = session_in(&dir, |c| {
        c.output.served = true;
        c.output.reports_dir = reports.display().to_string();
        c.output.client_id = Some("client-1234".to_string());
    });
    let finalizer = Finalizer::new(&session).unwrap();
    let tabular = finalizer.paths().tabular;
    write_tabular(&session, &tabular);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let artifacts = finalizer.finalize(&tabular, &ChannelSink::new(tx)).await;

    let published = artifacts.published.clone().expect("published copy");
    assert!(published.starts_with(reports.join("clien")));
    assert!(published
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("__example.com.json")));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::Result { local_path: Some(p), .. } if *p == published
    )));
}
