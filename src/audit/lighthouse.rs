//! Lighthouse auditor
//!
//! Runs audits against a dedicated headless Chrome, separate from the page
//! renderer. Chrome is started once in `open` with a remote debugging port and
//! every audit runs the `lighthouse` CLI against that port.

use crate::audit::{parse_lighthouse_report, AuditError, AuditReport, Auditor};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Settings for [`LighthouseAuditor`]
#[derive(Debug, Clone)]
pub struct LighthouseConfig {
    pub chrome_path: String,
    pub lighthouse_path: String,
    pub port: u16,
    pub headless: bool,
    /// Time to wait for Chrome to open its debugging port
    pub startup_wait: Duration,
}

impl Default for LighthouseConfig {
    fn default() -> Self {
        Self {
            chrome_path: "google-chrome".to_string(),
            lighthouse_path: "lighthouse".to_string(),
            port: 9222,
            headless: true,
            startup_wait: Duration::from_secs(2),
        }
    }
}

/// Auditor driving the Lighthouse CLI
pub struct LighthouseAuditor {
    config: LighthouseConfig,
    chrome: Mutex<Option<Child>>,
}

impl LighthouseAuditor {
    pub fn new(config: LighthouseConfig) -> Self {
        Self {
            config,
            chrome: Mutex::new(None),
        }
    }

    fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.config.port),
            "--no-sandbox".to_string(),
            "--no-first-run".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if self.config.headless {
            args.push("--headless".to_string());
        }
        args.push("about:blank".to_string());
        args
    }

    fn lighthouse_args(&self, url: &str, locale: &str) -> Vec<String> {
        vec![
            url.to_string(),
            format!("--port={}", self.config.port),
            format!("--locale={}", locale),
            "--output=json".to_string(),
            "--output-path=stdout".to_string(),
            "--quiet".to_string(),
        ]
    }
}

#[async_trait]
impl Auditor for LighthouseAuditor {
    async fn open(&self) -> Result<(), AuditError> {
        let mut chrome = self.chrome.lock().await;
        if chrome.is_some() {
            return Ok(());
        }

        let child = Command::new(&self.config.chrome_path)
            .args(self.chrome_args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AuditError::Launch(format!("{}: {}", self.config.chrome_path, e)))?;

        tracing::info!(
            "Started audit browser on port {} (pid {:?})",
            self.config.port,
            child.id()
        );
        *chrome = Some(child);
        drop(chrome);

        tokio::time::sleep(self.config.startup_wait).await;
        Ok(())
    }

    async fn audit(&self, url: &str, locale: &str) -> Result<AuditReport, AuditError> {
        if self.chrome.lock().await.is_none() {
            return Err(AuditError::NotOpen);
        }

        tracing::debug!("Running lighthouse for {}", url);
        let output = Command::new(&self.config.lighthouse_path)
            .args(self.lighthouse_args(url, locale))
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuditError::Failed {
                url: url.to_string(),
                reason: stderr.lines().last().unwrap_or("lighthouse failed").to_string(),
            });
        }

        parse_lighthouse_report(&String::from_utf8_lossy(&output.stdout))
    }

    async fn close(&self) {
        if let Some(mut child) = self.chrome.lock().await.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to stop audit browser: {}", e);
            }
        }
    }
}
