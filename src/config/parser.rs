use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use site_audit::config::load_config;
///
/// let config = load_config(Path::new("site-audit.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded in the structured report so two reports can be compared for the
/// settings they were produced with.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Hex-encoded SHA-256 of a configuration text
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
urls = ["https://example.com/"]
max-depth = 3
concurrency = 4
delay = 500
docs-extensions = ["pdf", "zip"]

[fields]
preset = "seo-minimal"
exclude = ["canonical"]
custom = ['section=$(".crumbs a").text()']

[output]
out-dir = "/tmp/reports"
xlsx = true

[influxdb]
enabled = true
url = "http://localhost:8086"
bucket = "seo"
max-send-count = 10
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.concurrency, Some(4));
        assert_eq!(config.crawler.delay, 500);
        assert_eq!(config.crawler.docs_extensions, vec!["pdf", "zip"]);
        assert_eq!(config.fields.preset, "seo-minimal");
        assert_eq!(config.fields.custom.len(), 1);
        assert!(config.output.xlsx);
        assert_eq!(config.influxdb.max_send_count, 10);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.crawler.max_depth, 10);
        assert_eq!(config.crawler.timeout, 10_000);
        assert!(config.crawler.limit_domain);
        assert!(config.crawler.skip_static);
        assert_eq!(config.fields.preset, "default");
        assert!(config.output.json);
        assert_eq!(config.output.retry_attempts, 5);
        assert_eq!(config.influxdb.max_send_count, 5);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/site-audit.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawler]\nconcurrency = 0\n");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("[crawler]\nmax-depth = 2\n");
        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_configs_different_hashes() {
        assert_ne!(hash_content("[crawler]\nmax-depth = 2\n"), hash_content("[crawler]\nmax-depth = 3\n"));
    }

    #[test]
    fn test_load_config_with_hash() {
        let file = create_temp_config("[fields]\npreset = \"minimal\"\n");
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.fields.preset, "minimal");
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }
}
