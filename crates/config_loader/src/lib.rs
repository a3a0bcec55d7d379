//! # Config Loader
//!
//! Loads source groups and retry policy for dispatchers.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `DispatchConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("failover.toml")).unwrap();
//! for group in &config.groups {
//!     println!("{}: {}", group.name, group.sources.join(","));
//! }
//! ```

mod parser;
mod validator;

pub use contracts::DispatchConfig;
pub use parser::ConfigFormat;

use contracts::DispatchError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Detects the format from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<DispatchConfig, DispatchError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatchConfig, DispatchError> {
        Self::parse_and_validate(content, format)
    }

    /// Non-fatal remarks on an already validated config
    pub fn warnings(config: &DispatchConfig) -> Vec<String> {
        crate::validator::warnings(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(config: &DispatchConfig) -> Result<String, DispatchError> {
        toml::to_string_pretty(config)
            .map_err(|e| DispatchError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize to a JSON string
    pub fn to_json(config: &DispatchConfig) -> Result<String, DispatchError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| DispatchError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, DispatchError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            DispatchError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            DispatchError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, DispatchError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatchConfig, DispatchError> {
        let config = parser::parse(content, format)?;
        crate::validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const MINIMAL_TOML: &str = r#"
[options]
fail_retries = 2
fail_retry_interval_ms = 250

[[groups]]
name = "hosts"
sources = ["h1", "h2", "h3"]
continuous = false

[[groups]]
name = "db"
sources = ["db-primary:5432", "db-replica:5432"]
max_passes = 20

[groups.options]
fail_retries = 0
fail_retry_interval_ms = 0
"#;

    #[test]
    fn test_load_from_str_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml)
            .expect("config should load");
        assert_eq!(config.groups.len(), 2);

        let hosts = config.group("hosts").unwrap();
        assert!(!hosts.continuous);
        assert_eq!(
            config.options_for(hosts).unwrap(),
            contracts::DispatchOptions::new(2, Duration::from_millis(250))
        );

        let db = config.group("db").unwrap();
        assert_eq!(db.max_passes, Some(20));
        assert_eq!(config.options_for(db).unwrap().fail_retries, 0);
    }

    #[test]
    fn test_load_rejects_negative_retries() {
        let content = r#"
[options]
fail_retries = -1

[[groups]]
name = "g"
sources = ["a"]
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, DispatchError::ConfigValidation { .. }), "got: {err}");
    }

    #[test]
    fn test_load_rejects_missing_groups() {
        let err = ConfigLoader::load_from_str("[options]\nfail_retries = 1\n", ConfigFormat::Toml)
            .unwrap_err();
        // `groups` has no serde default
        assert!(matches!(err, DispatchError::ConfigParse { .. }), "got: {err}");
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.groups[0].name, "hosts");
    }

    #[test]
    fn test_load_from_path_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let err = ConfigLoader::load_from_path(Path::new("/nonexistent/failover.toml")).unwrap_err();
        assert!(matches!(err, DispatchError::Io(_)));
    }

    #[test]
    fn test_toml_json_round_trip() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();

        let json = ConfigLoader::to_json(&config).unwrap();
        let from_json = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(from_json.groups[1].sources, config.groups[1].sources);

        let toml = ConfigLoader::to_toml(&from_json).unwrap();
        let again = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(again.options, config.options);
        assert_eq!(again.groups[1].options, config.groups[1].options);
    }

    #[test]
    fn test_warnings_passthrough() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        // hosts: single pass; db: capped and no retries
        assert!(ConfigLoader::warnings(&config).is_empty());
    }
}
