use crate::config::types::{Config, CrawlerConfig, FieldsConfig, InfluxConfig, OutputConfig};
use crate::fields::CustomField;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fields_config(&config.fields)?;
    validate_output_config(&config.output)?;
    validate_influx_config(&config.influxdb)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency == Some(0) {
        return Err(ConfigError::Validation(
            "concurrency must be at least 1".to_string(),
        ));
    }

    if config.max_concurrency == Some(0) {
        return Err(ConfigError::Validation(
            "max-concurrency must be at least 1".to_string(),
        ));
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "timeout must be greater than 0ms".to_string(),
        ));
    }

    if config.docs_extensions.iter().any(|ext| ext.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "docs-extensions cannot contain empty entries".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    // a URL-list source may be a local file
    if !config.url_list {
        for url in &config.urls {
            validate_http_url(url, "start URL")?;
        }
    }

    Ok(())
}

/// Validates custom field declarations
fn validate_fields_config(config: &FieldsConfig) -> Result<(), ConfigError> {
    for declaration in &config.custom {
        CustomField::from_declaration(declaration)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.out_dir.trim().is_empty() {
        return Err(ConfigError::Validation("out-dir cannot be empty".to_string()));
    }

    if config.upload {
        match &config.upload_url {
            Some(url) => validate_http_url(url, "upload-url")?,
            None => {
                return Err(ConfigError::Validation(
                    "upload is enabled but upload-url is not set".to_string(),
                ))
            }
        }
    }

    if config.served && config.reports_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "reports-dir cannot be empty in served mode".to_string(),
        ));
    }

    Ok(())
}

/// Validates InfluxDB configuration
fn validate_influx_config(config: &InfluxConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.url.is_empty() || config.bucket.is_empty() {
        return Err(ConfigError::Validation(
            "influxdb is enabled but url or bucket is not set".to_string(),
        ));
    }
    validate_http_url(&config.url, "influxdb url")?;

    if config.max_send_count == 0 {
        return Err(ConfigError::Validation(
            "influxdb max-send-count must be at least 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(url: &str, what: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, url, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, url
        )));
    }
    Ok(())
}
