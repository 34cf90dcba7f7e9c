use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use toml::{Table, Value};

/// Where an in-memory configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from the file, missing keys defaulted
    File,
    /// No file existed; defaults were used
    Missing,
    /// The file could not be read or parsed; defaults were used and the file left alone
    Corrupt,
}

/// Loads and parses a configuration file from the given path
///
/// Missing keys take their defaults, but an unreadable file, invalid TOML or a
/// configuration that fails validation is an error.
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
/// use doc_trawler::config::load_config;
///
/// let config = load_config(Path::new("doc-trawler.toml")).unwrap();
/// println!("Max concurrent: {}", config.crawl.max_concurrent);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads a configuration, falling back to defaults instead of failing
///
/// A missing file logs a warning; a corrupt file logs an error. In both cases the
/// full default configuration is returned and nothing is written to disk.
pub fn load_config_or_default(path: &Path) -> (Config, ConfigOrigin) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("{} not found, using default configuration", path.display());
            return (Config::default(), ConfigOrigin::Missing);
        }
        Err(e) => {
            tracing::error!(
                "Failed to read {}: {}. Using default configuration",
                path.display(),
                e
            );
            return (Config::default(), ConfigOrigin::Corrupt);
        }
    };

    match toml::from_str::<Config>(&content) {
        Ok(config) => (config, ConfigOrigin::File),
        Err(e) => {
            tracing::error!(
                "Invalid {}: {}. Using default configuration",
                path.display(),
                e
            );
            (Config::default(), ConfigOrigin::Corrupt)
        }
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Writes the values of `config` that differ from the defaults to `path`
///
/// Returns `Ok(false)` without touching the file when every value is a default.
pub fn persist_overrides(path: &Path, config: &Config) -> Result<bool, ConfigError> {
    let current = Value::try_from(config)?;
    let defaults = Value::try_from(Config::default())?;

    let overrides = match (current, defaults) {
        (Value::Table(current), Value::Table(defaults)) => diff_tables(current, &defaults),
        _ => Table::new(),
    };

    if overrides.is_empty() {
        tracing::debug!("Configuration matches defaults, not saving");
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(&overrides)?)?;
    tracing::info!("Configuration saved to {}", path.display());
    Ok(true)
}

/// Keeps only the entries of `current` whose value differs from `defaults`
fn diff_tables(current: Table, defaults: &Table) -> Table {
    let mut out = Table::new();
    for (key, value) in current {
        match (value, defaults.get(&key)) {
            (Value::Table(inner), Some(Value::Table(default_inner))) => {
                let nested = diff_tables(inner, default_inner);
                if !nested.is_empty() {
                    out.insert(key, Value::Table(nested));
                }
            }
            (value, Some(default)) if &value == default => {}
            (value, _) => {
                out.insert(key, value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawl]
url = "https://docs.example.com/guide"
max-concurrent = 8
max-retries = 2

[output]
output-dir = "./out"

[intelligence]
base-url = "http://127.0.0.1:11434"
model = "llama3.2:3b"
embed-model = "nomic-embed-text"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.url, "https://docs.example.com/guide");
        assert_eq!(config.crawl.max_concurrent, 8);
        assert_eq!(config.crawl.max_retries, 2);
        assert_eq!(config.output.output_dir, "./out");
        assert_eq!(config.intelligence.base_url, "http://127.0.0.1:11434");
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let file = create_temp_config("[crawl]\nmax-retries = 7\n");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.max_retries, 7);
        assert_eq!(config.crawl.max_concurrent, 5);
        assert_eq!(config.crawl.chunk_size, 5000);
        assert_eq!(config.output, Default::default());
        assert_eq!(config.intelligence.embedding_dim, 768);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/doc-trawler.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawl]\nmax-concurrent = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_fallback_when_missing() {
        let dir = TempDir::new().unwrap();
        let (config, origin) = load_config_or_default(&dir.path().join("absent.toml"));
        assert_eq!(origin, ConfigOrigin::Missing);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_fallback_when_corrupt_leaves_file_untouched() {
        let content = "max-concurrent = [oops";
        let file = create_temp_config(content);

        let (config, origin) = load_config_or_default(file.path());

        assert_eq!(origin, ConfigOrigin::Corrupt);
        assert_eq!(config, Config::default());
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), content);
    }

    #[test]
    fn test_persist_overrides_skips_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc-trawler.toml");

        let saved = persist_overrides(&path, &Config::default()).unwrap();

        assert!(!saved);
        assert!(!path.exists());
    }

    #[test]
    fn test_persist_overrides_writes_only_changed_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc-trawler.toml");

        let mut config = Config::default();
        config.crawl.max_concurrent = 12;
        config.intelligence.model = "qwen2.5:7b".to_string();

        assert!(persist_overrides(&path, &config).unwrap());

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("max-concurrent = 12"));
        assert!(written.contains("qwen2.5:7b"));
        assert!(!written.contains("max-retries"));
        assert!(!written.contains("[output]"));

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
