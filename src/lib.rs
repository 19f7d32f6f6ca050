//! Site-Audit: a crawling SEO auditor
//!
//! This crate crawls a website (or a list of URLs), extracts a configurable set
//! of SEO and performance fields from every page, validates them, and exports
//! the results as tabular, spreadsheet and structured reports.

pub mod audit;
pub mod config;
pub mod crawler;
pub mod fields;
pub mod output;
pub mod policy;
pub mod render;
pub mod robots;
pub mod state;
pub mod url;
pub mod validate;

use thiserror::Error;

/// Main error type for Site-Audit operations
#[derive(Debug, Error)]
pub enum SiteAuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Field catalog error: {0}")]
    Field(#[from] fields::FieldError),

    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    #[error("Render error: {0}")]
    Render(#[from] render::RenderError),

    #[error("Audit error: {0}")]
    Audit(#[from] audit::AuditError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Export error: {0}")]
    Export(#[from] output::ExportError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::SessionState,
        to: state::SessionState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Output directory is a file: {0}")]
    OutputDirIsFile(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Site-Audit operations
pub type Result<T> = std::result::Result<T, SiteAuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, SessionConfig};
pub use crawler::{CrawlEvent, CrawlSession, EventSink, PageResult};
pub use fields::{FieldCatalog, FieldValue};
pub use policy::{RequestDecision, RequestPolicy, ResourceType};
pub use state::SessionState;
