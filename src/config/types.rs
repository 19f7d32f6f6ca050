use serde::Deserialize;

/// Extensions treated as downloadable documents unless configured otherwise
pub const DEFAULT_DOCS_EXTENSIONS: &[&str] =
    &["doc", "docx", "xls", "xlsx", "ppt", "pptx", "pdf", "rar", "zip"];

/// Main configuration structure for Site-Audit
///
/// Every key has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fields: FieldsConfig,
    pub audit: AuditConfig,
    pub output: OutputConfig,
    pub influxdb: InfluxConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Start URLs; more than one switches to URL-list mode
    pub urls: Vec<String>,

    /// Treat the start URL as a document listing the URLs to scan
    pub url_list: bool,

    pub max_depth: u32,

    /// Parallel page visits; defaults to min(10, available parallelism)
    pub concurrency: Option<usize>,

    /// Upper bound applied to the resolved concurrency
    pub max_concurrency: Option<usize>,

    /// Stop queueing after this many pages (0 = unlimited)
    pub max_requests: usize,

    /// Pause after each page visit (milliseconds)
    pub delay: u64,

    /// Page request timeout (milliseconds)
    pub timeout: u64,

    /// Only follow links on the start host
    pub limit_domain: bool,

    /// Do not load images, stylesheets and scripts
    pub skip_static: bool,

    pub docs_extensions: Vec<String>,
    pub follow_xml_sitemap: bool,
    pub ignore_robots_txt: bool,
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            url_list: false,
            max_depth: 10,
            concurrency: None,
            max_concurrency: None,
            max_requests: 0,
            delay: 0,
            timeout: 10_000,
            limit_domain: true,
            skip_static: true,
            docs_extensions: DEFAULT_DOCS_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            follow_xml_sitemap: false,
            ignore_robots_txt: false,
            user_agent: format!("site-audit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Report column configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FieldsConfig {
    pub preset: String,

    /// Terminal field names to drop from the preset
    pub exclude: Vec<String>,

    /// Custom fields as `name=expression` declarations
    pub custom: Vec<String>,

    /// Filter applied by default when the JSON report is viewed, e.g. `depth>1`
    pub default_filter: String,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            preset: crate::fields::presets::DEFAULT_PRESET.to_string(),
            exclude: Vec::new(),
            custom: Vec::new(),
            default_filter: String::new(),
        }
    }
}

/// Audit (Lighthouse) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AuditConfig {
    pub lighthouse: bool,
    pub screenshot: bool,

    /// Report language; unsupported values fall back to the system locale
    pub lang: Option<String>,

    pub chrome_path: String,
    pub lighthouse_path: String,
    pub port: u16,
    pub headless: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            lighthouse: false,
            screenshot: false,
            lang: None,
            chrome_path: "google-chrome".to_string(),
            lighthouse_path: "lighthouse".to_string(),
            port: 9222,
            headless: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    pub out_dir: String,

    /// Base file name; defaults to the start host
    pub out_name: Option<String>,

    pub xlsx: bool,
    pub json: bool,
    pub remove_csv: bool,
    pub remove_json: bool,

    pub upload: bool,
    pub upload_url: Option<String>,

    /// Served mode: publish reports to `reports-dir` instead of a one-shot run
    pub served: bool,
    pub reports_dir: String,
    pub client_id: Option<String>,

    /// Retries after a busy/locked failure
    pub retry_attempts: u32,
    /// Pause between retries (seconds)
    pub retry_backoff: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: "~/site-audit/".to_string(),
            out_name: None,
            xlsx: false,
            json: true,
            remove_csv: true,
            remove_json: false,
            upload: false,
            upload_url: None,
            served: false,
            reports_dir: "data/reports".to_string(),
            client_id: None,
            retry_attempts: 5,
            retry_backoff: 10,
        }
    }
}

/// InfluxDB time-series export configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InfluxConfig {
    pub enabled: bool,
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
    pub measurement: String,
    pub max_send_count: usize,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            org: String::new(),
            bucket: String::new(),
            token: String::new(),
            measurement: "site_audit".to_string(),
            max_send_count: 5,
        }
    }
}
