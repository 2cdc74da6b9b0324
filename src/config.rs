//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::model::GradeScale;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub grading: GradingConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| {
            p.join("gradebook")
                .join("gradebook.db")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./gradebook.db".to_string())
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl StoreConfig {
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Default::default()
        }
    }

    /// Database path with a leading `~` expanded to the home directory
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.database_path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Grade scale configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GradingConfig {
    #[serde(default = "default_min_grade")]
    pub min_grade: f64,

    #[serde(default = "default_max_grade")]
    pub max_grade: f64,
}

fn default_min_grade() -> f64 {
    2.0
}

fn default_max_grade() -> f64 {
    5.0
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            min_grade: default_min_grade(),
            max_grade: default_max_grade(),
        }
    }
}

impl GradingConfig {
    pub fn scale(&self) -> Result<GradeScale, ConfigError> {
        GradeScale::new(self.min_grade, self.max_grade)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Query engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,

    /// Optional per-query timeout; unset means no timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_top_n() -> usize {
    5
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_n: default_top_n(),
            timeout_ms: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("gradebook").join("config.toml")),
            Some(PathBuf::from("/etc/gradebook/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        match Self::from_env() {
            Ok(config) => {
                tracing::info!("Using default config with environment overrides");
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring environment overrides: {}", e);
                Config::default()
            }
        }
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grading.scale()?;
        if self.query.default_top_n == 0 {
            return Err(ConfigError::Invalid(
                "query.default_top_n must be at least 1".to_string(),
            ));
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                other
            ))),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("GRADEBOOK_DB_PATH") {
            self.store.database_path = path;
        }
        if let Some(timeout) = parse_env("GRADEBOOK_BUSY_TIMEOUT_MS") {
            self.store.busy_timeout_ms = timeout;
        }

        if let Some(min) = parse_env("GRADEBOOK_MIN_GRADE") {
            self.grading.min_grade = min;
        }
        if let Some(max) = parse_env("GRADEBOOK_MAX_GRADE") {
            self.grading.max_grade = max;
        }

        if let Some(n) = parse_env("GRADEBOOK_DEFAULT_TOP_N") {
            self.query.default_top_n = n;
        }
        if let Some(timeout) = parse_env("GRADEBOOK_QUERY_TIMEOUT_MS") {
            self.query.timeout_ms = Some(timeout);
        }

        if let Ok(level) = std::env::var("GRADEBOOK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("GRADEBOOK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Read and parse one override; a value that does not parse is skipped
fn parse_env<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", name, raw, e);
            None
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Gradebook Configuration
#
# Environment variables override these settings:
# - GRADEBOOK_DB_PATH
# - GRADEBOOK_BUSY_TIMEOUT_MS
# - GRADEBOOK_MIN_GRADE
# - GRADEBOOK_MAX_GRADE
# - GRADEBOOK_DEFAULT_TOP_N
# - GRADEBOOK_QUERY_TIMEOUT_MS
# - GRADEBOOK_LOG_LEVEL
# - GRADEBOOK_LOG_FORMAT

[store]
# SQLite database file; a leading ~ is the home directory
database_path = "~/.local/share/gradebook/gradebook.db"

# How long a connection waits on a locked database (ms)
busy_timeout_ms = 5000

[grading]
# Inclusive grade scale
min_grade = 2.0
max_grade = 5.0

[query]
# Number of students returned by top-performers when no count is given
default_top_n = 5

# Optional per-query timeout (ms)
# timeout_ms = 2000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Tests that touch GRADEBOOK_* variables must not interleave
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.grading.min_grade, 2.0);
        assert_eq!(config.grading.max_grade, 5.0);
        assert_eq!(config.query.default_top_n, 5);
        assert_eq!(config.query.timeout_ms, None);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();

        assert_eq!(config.query.default_top_n, 5);
        assert_eq!(config.grading.scale().unwrap(), GradeScale::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[grading]\nmax_grade = 10.0\n").unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.grading.min_grade, 2.0);
        assert_eq!(config.grading.max_grade, 10.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[grading]\nmin_grade = 5.0\nmax_grade = 2.0\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let mut config = Config::default();
        config.query.default_top_n = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempdir().unwrap();

        let missing = Config::load(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[store\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides_file() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[query]\ndefault_top_n = 3\n").unwrap();

        std::env::set_var("GRADEBOOK_DEFAULT_TOP_N", "7");
        let config = Config::load_with_env(&path);
        std::env::remove_var("GRADEBOOK_DEFAULT_TOP_N");

        assert_eq!(config.unwrap().query.default_top_n, 7);
        assert_eq!(Config::load(&path).unwrap().query.default_top_n, 3);
    }

    #[test]
    fn test_env_only_config_is_validated() {
        let _env = ENV_LOCK.lock().unwrap();

        std::env::set_var("GRADEBOOK_DEFAULT_TOP_N", "0");
        let zero_top_n = Config::from_env();
        std::env::remove_var("GRADEBOOK_DEFAULT_TOP_N");
        assert!(matches!(zero_top_n, Err(ConfigError::Invalid(_))));

        std::env::set_var("GRADEBOOK_MIN_GRADE", "5.0");
        std::env::set_var("GRADEBOOK_MAX_GRADE", "2.0");
        let inverted = Config::from_env();
        std::env::remove_var("GRADEBOOK_MIN_GRADE");
        std::env::remove_var("GRADEBOOK_MAX_GRADE");
        assert!(matches!(inverted, Err(ConfigError::Invalid(_))));

        std::env::set_var("GRADEBOOK_DEFAULT_TOP_N", "3");
        let config = Config::from_env();
        std::env::remove_var("GRADEBOOK_DEFAULT_TOP_N");
        assert_eq!(config.unwrap().query.default_top_n, 3);
    }

    #[test]
    fn test_unparsable_env_value_is_skipped() {
        let _env = ENV_LOCK.lock().unwrap();

        std::env::set_var("GRADEBOOK_DEFAULT_TOP_N", "many");
        std::env::set_var("GRADEBOOK_QUERY_TIMEOUT_MS", "250");
        let config = Config::from_env();
        std::env::remove_var("GRADEBOOK_DEFAULT_TOP_N");
        std::env::remove_var("GRADEBOOK_QUERY_TIMEOUT_MS");

        let config = config.unwrap();
        assert_eq!(config.query.default_top_n, 5);
        assert_eq!(config.query.timeout_ms, Some(250));
    }

    #[test]
    fn test_home_directory_expansion() {
        let home = dirs::home_dir().unwrap();

        let config = StoreConfig::new("~/.local/share/gradebook/gradebook.db");
        assert_eq!(
            config.resolved_path(),
            home.join(".local/share/gradebook/gradebook.db")
        );
        assert_eq!(StoreConfig::new("~").resolved_path(), home);
        assert_eq!(
            StoreConfig::new("~user/grades.db").resolved_path(),
            PathBuf::from("~user/grades.db")
        );
        assert_eq!(
            StoreConfig::new("/tmp/grades.db").resolved_path(),
            PathBuf::from("/tmp/grades.db")
        );
    }
}
