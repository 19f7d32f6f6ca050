//! Resolution of the loaded configuration into the immutable session settings

use crate::config::types::{Config, InfluxConfig};
use crate::fields::{self, presets, CustomField, FieldCatalog};
use crate::output::RetryPolicy;
use crate::policy::StaticSkip;
use crate::{ConfigError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Report locales understood by the audit engine
pub const SUPPORTED_LOCALES: &[&str] = &["en", "fr", "de", "ru"];

/// Upper bound of the default concurrency
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Output settings after defaults and couplings are applied
#[derive(Debug, Clone)]
pub struct OutputSettings {
    /// Existing directory all artifacts are written to
    pub out_dir: PathBuf,
    /// Base name shared by the csv, xlsx and json files
    pub out_name: String,
    pub xlsx: bool,
    pub json: bool,
    pub remove_csv: bool,
    pub remove_json: bool,
    pub upload: bool,
    pub upload_url: Option<String>,
    pub served: bool,
    pub reports_dir: PathBuf,
    pub client_id: Option<String>,
    pub retry: RetryPolicy,
}

/// Immutable settings for one crawl session
///
/// Built once by [`SessionConfig::resolve`]. The concurrency couplings are
/// enforced here so the rest of the crate can rely on them:
/// - a delay forces a single worker
/// - audit or screenshot mode forces a single worker
/// - concurrency never exceeds the available parallelism
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub start_urls: Vec<String>,
    pub url_list: bool,
    pub limit_domain: bool,
    pub max_depth: u32,
    pub concurrency: usize,
    pub max_requests: usize,
    pub delay: Duration,
    pub timeout: Duration,
    pub skip_static: StaticSkip,
    pub docs_extensions: Vec<String>,
    pub follow_xml_sitemap: bool,
    pub ignore_robots_txt: bool,
    pub user_agent: String,
    pub catalog: FieldCatalog,
    pub audit_enabled: bool,
    pub screenshot: bool,
    pub locale: String,
    pub default_filter: String,
    pub output: OutputSettings,
    pub influx: InfluxConfig,
    /// Hash of the configuration file, recorded in the report
    pub config_hash: Option<String>,
}

impl SessionConfig {
    /// Resolves the session settings from a loaded configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration (file plus CLI overrides)
    /// * `parallelism` - Available CPU parallelism of the host
    ///
    /// # Errors
    ///
    /// Fails when a custom field declaration is malformed or the output
    /// directory cannot be created (or is an existing file). An unknown preset
    /// is not an error: the default preset is used and a warning is logged.
    pub fn resolve(config: &Config, parallelism: usize) -> Result<Self> {
        let crawler = &config.crawler;
        let parallelism = parallelism.max(1);

        let url_list = crawler.url_list || crawler.urls.len() > 1;
        let (max_depth, limit_domain, ignore_robots_txt) = if url_list {
            (1, false, true)
        } else {
            (crawler.max_depth, crawler.limit_domain, crawler.ignore_robots_txt)
        };

        let audit_enabled = config.audit.lighthouse || presets::requires_audit(&config.fields.preset);
        let screenshot = config.audit.screenshot;

        let mut concurrency = crawler
            .concurrency
            .unwrap_or_else(|| DEFAULT_MAX_CONCURRENCY.min(parallelism));
        if let Some(max) = crawler.max_concurrency {
            concurrency = concurrency.min(max);
        }
        if crawler.delay > 0 || audit_enabled || screenshot {
            concurrency = 1;
        }
        concurrency = concurrency.clamp(1, parallelism);

        let custom = config
            .fields
            .custom
            .iter()
            .map(|declaration| CustomField::from_declaration(declaration))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let catalog = fields::resolve(&config.fields.preset, &config.fields.exclude, &custom, audit_enabled)?;

        let output = resolve_output(config, &crawler.urls)?;

        Ok(Self {
            start_urls: crawler.urls.clone(),
            url_list,
            limit_domain,
            max_depth,
            concurrency,
            max_requests: crawler.max_requests,
            delay: Duration::from_millis(crawler.delay),
            timeout: Duration::from_millis(crawler.timeout),
            skip_static: StaticSkip::all(crawler.skip_static),
            docs_extensions: crawler.docs_extensions.clone(),
            follow_xml_sitemap: crawler.follow_xml_sitemap,
            ignore_robots_txt,
            user_agent: crawler.user_agent.clone(),
            catalog,
            audit_enabled,
            screenshot,
            locale: resolve_locale(config.audit.lang.as_deref(), system_locale().as_deref()),
            default_filter: config.fields.default_filter.clone(),
            output,
            influx: config.influxdb.clone(),
            config_hash: None,
        })
    }

    /// Re-applies the concurrency couplings to settings that may have been
    /// edited after [`SessionConfig::resolve`]
    pub fn enforce_concurrency(&mut self, parallelism: usize) {
        let mut concurrency = self.concurrency.clamp(1, parallelism.max(1));
        if !self.delay.is_zero() || self.audit_enabled || self.screenshot {
            concurrency = 1;
        }
        if concurrency != self.concurrency {
            tracing::warn!("Concurrency {} lowered to {}", self.concurrency, concurrency);
            self.concurrency = concurrency;
        }
    }

    /// Human-readable summary printed before the crawl starts
    pub fn brief(&self) -> String {
        let mut lines = vec![
            format!("Preset:              {}", self.catalog.preset()),
            format!("Threads:             {}", self.concurrency),
            format!("Lighthouse:          {}", yes_no(self.audit_enabled)),
            format!("Delay:               {} ms", self.delay.as_millis()),
            format!("Timeout:             {} ms", self.timeout.as_millis()),
            format!("Ignore robots.txt:   {}", yes_no(self.ignore_robots_txt)),
            format!("Follow sitemap.xml:  {}", yes_no(self.follow_xml_sitemap)),
            format!("Max depth:           {}", self.max_depth),
        ];
        if self.max_requests > 0 {
            lines.push(format!("Max requests:        {}", self.max_requests));
        }
        lines.push(format!("Language:            {}", self.locale));
        if !self.catalog.custom_fields().is_empty() {
            let names: Vec<&str> = self.catalog.custom_fields().iter().map(|f| f.name.as_str()).collect();
            lines.push(format!("Custom fields:       {}", names.join(", ")));
        }
        lines.push(format!("Output:              {}", self.output.out_dir.display()));
        lines.join("\n")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn resolve_output(config: &Config, urls: &[String]) -> Result<OutputSettings> {
    let output = &config.output;

    let out_dir = prepare_out_dir(&output.out_dir)?;
    let out_name = output
        .out_name
        .clone()
        .or_else(|| urls.first().and_then(|u| Url::parse(u).ok()).and_then(|u| u.host_str().map(str::to_string)))
        .map(|name| sanitize_file_name(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "site-audit".to_string());

    // Upload needs the json report; dropping the json means there is nothing to remove
    let json = output.json || output.upload;
    let remove_json = json && output.remove_json;

    Ok(OutputSettings {
        out_dir,
        out_name,
        xlsx: output.xlsx,
        json,
        remove_csv: output.remove_csv,
        remove_json,
        upload: output.upload,
        upload_url: output.upload_url.clone(),
        served: output.served,
        reports_dir: PathBuf::from(shellexpand::tilde(&output.reports_dir).as_ref()),
        client_id: output.client_id.clone(),
        retry: RetryPolicy {
            retries: output.retry_attempts,
            backoff: Duration::from_secs(output.retry_backoff),
        },
    })
}

/// Expands `~` in the output directory and creates it
fn prepare_out_dir(raw: &str) -> std::result::Result<PathBuf, ConfigError> {
    let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
    if path.is_file() {
        return Err(ConfigError::OutputDirIsFile(path.display().to_string()));
    }
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Replaces characters that are unsafe in file names with `_`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Picks the report locale
///
/// A supported requested locale wins; otherwise the system locale decides
/// (`ru*` -> `ru`, anything else -> `en`).
pub fn resolve_locale(requested: Option<&str>, system: Option<&str>) -> String {
    if let Some(lang) = requested {
        let lang = lang.trim().to_lowercase();
        if SUPPORTED_LOCALES.contains(&lang.as_str()) {
            return lang;
        }
        tracing::warn!("Unsupported language '{}', using the system locale", lang);
    }

    match system {
        Some(locale) if locale.to_lowercase().starts_with("ru") => "ru".to_string(),
        _ => "en".to_string(),
    }
}

fn system_locale() -> Option<String> {
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
}
