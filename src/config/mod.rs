//! Configuration module for Site-Audit
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving them into the immutable [`SessionConfig`].
//!
//! # Example
//!
//! ```no_run
//! use site_audit::config::{load_config, SessionConfig};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site-audit.toml")).unwrap();
//! let session = SessionConfig::resolve(&config, 4).unwrap();
//! println!("Crawler will use {} workers", session.concurrency);
//! ```

mod parser;
mod session;
mod types;
mod validation;

// Re-export types
pub use session::{resolve_locale, sanitize_file_name, OutputSettings, SessionConfig, SUPPORTED_LOCALES};
pub use types::{
    AuditConfig, Config, CrawlerConfig, FieldsConfig, InfluxConfig, OutputConfig, DEFAULT_DOCS_EXTENSIONS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
