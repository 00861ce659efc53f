use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::eval::MatchMode;
use crate::text::TokenizerKind;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "QACURATE_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database holding `documents(id, text)` and its FTS5 index.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Directory with the `NNN_name.sql` schema migrations.
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            migrations_dir: default_migrations_dir(),
        }
    }
}

/// Error-scoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Tokenizer for `string` matching.
    #[serde(default)]
    pub tokenizer: TokenizerKind,
    /// Number of candidate documents retrieved per question.
    #[serde(default = "default_n_docs")]
    pub n_docs: usize,
    /// Worker count; None = available parallelism.
    #[serde(default)]
    pub num_workers: Option<usize>,
    /// Per-worker LRU capacity for fetched document text.
    #[serde(default = "default_doc_cache_capacity")]
    pub doc_cache_capacity: usize,
    /// Bound of the channel feeding the error-record writer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            tokenizer: TokenizerKind::default(),
            n_docs: default_n_docs(),
            num_workers: None,
            doc_cache_capacity: default_doc_cache_capacity(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the `<dataset>-<model>.errs` file is written to.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("docs.db")
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_n_docs() -> usize {
    5
}

fn default_doc_cache_capacity() -> usize {
    256
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_out_dir() -> PathBuf {
    std::env::temp_dir()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in QACURATE_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (defaults are used when absent)
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let path = PathBuf::from("config.toml");
                if path.is_file() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("No config.toml found, using defaults");
                    Config::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scoring.n_docs == 0 {
            anyhow::bail!("scoring.n_docs must be greater than 0");
        }

        if self.scoring.num_workers == Some(0) {
            anyhow::bail!("scoring.num_workers must be greater than 0 when set");
        }

        if self.scoring.doc_cache_capacity == 0 {
            anyhow::bail!("scoring.doc_cache_capacity must be greater than 0");
        }

        if self.scoring.channel_capacity == 0 {
            anyhow::bail!("scoring.channel_capacity must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }

    /// Get migrations directory
    pub fn migrations_dir(&self) -> &Path {
        &self.store.migrations_dir
    }

    /// Worker count, resolving "unset" to the machine's available parallelism.
    pub fn num_workers(&self) -> usize {
        self.scoring.num_workers.unwrap_or_else(default_workers)
    }
}

/// Available parallelism, falling back to a single worker.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const FULL_CONFIG: &str = r#"
[store]
db_path = "/data/wiki.db"
migrations_dir = "./migrations"

[scoring]
match_mode = "regex"
tokenizer = "simple"
n_docs = 10
num_workers = 4
doc_cache_capacity = 64
channel_capacity = 16

[output]
out_dir = "/tmp/errs"
"#;

    #[test]
    fn test_config_parse_full() {
        let config = Config::from_toml_str(FULL_CONFIG).unwrap();
        assert_eq!(config.db_path(), Path::new("/data/wiki.db"));
        assert_eq!(config.scoring.match_mode, MatchMode::Regex);
        assert_eq!(config.scoring.tokenizer, TokenizerKind::Simple);
        assert_eq!(config.scoring.n_docs, 10);
        assert_eq!(config.num_workers(), 4);
        assert_eq!(config.output.out_dir, PathBuf::from("/tmp/errs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_defaults_for_missing_sections() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.scoring.match_mode, MatchMode::String);
        assert_eq!(config.scoring.tokenizer, TokenizerKind::Regexp);
        assert_eq!(config.scoring.n_docs, 5);
        assert!(config.scoring.num_workers.is_none());
        assert!(config.num_workers() >= 1);
        assert_eq!(config.db_path(), Path::new("docs.db"));
    }

    #[test]
    fn test_config_rejects_zero_n_docs() {
        let config = Config::from_toml_str("[scoring]\nn_docs = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("n_docs"));
    }

    #[test]
    fn test_config_rejects_zero_workers() {
        let config = Config::from_toml_str("[scoring]\nnum_workers = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_unknown_match_mode() {
        assert!(Config::from_toml_str("[scoring]\nmatch_mode = \"fuzzy\"\n").is_err());
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("qacurate.toml");
        fs::write(&config_path, FULL_CONFIG).unwrap();

        let original = std::env::var(CONFIG_ENV).ok();
        std::env::set_var(CONFIG_ENV, &config_path);
        let config = Config::load();
        std::env::remove_var(CONFIG_ENV);
        if let Some(v) = original {
            std::env::set_var(CONFIG_ENV, v);
        }

        let config = config.unwrap();
        assert_eq!(config.scoring.n_docs, 10);
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var(CONFIG_ENV).ok();
        std::env::set_var(CONFIG_ENV, "nonexistent.toml");
        let config = Config::load();
        std::env::remove_var(CONFIG_ENV);
        if let Some(v) = original {
            std::env::set_var(CONFIG_ENV, v);
        }
        assert!(config.is_err());
    }
}
