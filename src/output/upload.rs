//! Report upload

use crate::output::finalize::ExportError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::Path;

/// Publishes a report file and returns its public URL
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<String, ExportError>;
}

/// POSTs the JSON report to an HTTP endpoint
///
/// The endpoint answers with the public URL, either as the plain body or as
/// the `url` field of a JSON object.
pub struct HttpUploader {
    client: Client,
    endpoint: String,
}

impl HttpUploader {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, path: &Path) -> Result<String, ExportError> {
        let body = tokio::fs::read(path).await.map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExportError::Upload(e.to_string()))?;
        let text = response
            .text()
            .await
            .map_err(|e| ExportError::Upload(e.to_string()))?;

        public_url(&text).ok_or_else(|| ExportError::Upload("empty response".to_string()))
    }
}

fn public_url(body: &str) -> Option<String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        return map.get("url").and_then(|u| u.as_str()).map(str::to_string);
    }
    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_public_url_from_json_or_text() {
        assert_eq!(
            public_url(r#"{"url": "https://viewer.example.com/r/1"}"#).as_deref(),
            Some("https://viewer.example.com/r/1")
        );
        assert_eq!(
            public_url("https://viewer.example.com/r/2\n").as_deref(),
            Some("https://viewer.example.com/r/2")
        );
        assert_eq!(public_url(r#"{"status": "ok"}"#), None);
        assert_eq!(public_url("  "), None);
    }

    #[tokio::test]
    async fn test_upload_posts_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"url":"https://viewer.example.com/r/9"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let report = dir.path().join("report.json");
        std::fs::write(&report, r#"{"items":[]}"#).unwrap();

        let uploader = HttpUploader::new(Client::new(), format!("{}/upload", server.uri()));
        assert_eq!(
            uploader.upload(&report).await.unwrap(),
            "https://viewer.example.com/r/9"
        );
    }

    #[tokio::test]
    async fn test_upload_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let report = dir.path().join("report.json");
        std::fs::write(&report, "{}").unwrap();

        let uploader = HttpUploader::new(Client::new(), server.uri());
        assert!(matches!(uploader.upload(&report).await, Err(ExportError::Upload(_))));
    }
}
