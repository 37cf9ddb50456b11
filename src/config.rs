//! Configuration module for the retrieval service.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI overrides (`--config`, `--debug`)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TR_` and use double underscores
//! to separate nested levels:
//! - `TR_SEMANTIC__TOP_K=8` sets `semantic.top_k`
//! - `TR_CORPUS__INDEX_NAME="Nasdaq-100"` sets `corpus.index_name`
//! - `TR_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding settings, index and cached data.
pub const CONFIG_DIR: &str = ".tickrag";

/// Settings file name inside [`CONFIG_DIR`].
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the persisted index artifacts
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .tickrag is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    /// Embedding and query settings
    #[serde(default)]
    pub semantic: SemanticConfig,

    /// Source records and document rendering
    #[serde(default)]
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SemanticConfig {
    /// fastembed model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Number of results fed into the context block
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Texts embedded per model call while building the index
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on a single async query, in milliseconds
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Model cache directory (defaults to the platform cache dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CorpusConfig {
    /// Listing named in document prose and the context header
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Cached constituents list (JSON array of records)
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for the log filter; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("index")
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_top_k() -> usize {
    5
}
fn default_batch_size() -> usize {
    64
}
fn default_query_timeout_ms() -> u64 {
    2000
}
fn default_index_name() -> String {
    "S&P 500".to_string()
}
fn default_records_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("data").join("sp500_list.json")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            workspace_root: None,
            debug: false,
            semantic: SemanticConfig::default(),
            corpus: CorpusConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            top_k: default_top_k(),
            batch_size: default_batch_size(),
            query_timeout_ms: default_query_timeout_ms(),
            cache_dir: None,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            records_path: default_records_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));

        Self::figment(config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref().to_path_buf())
            .extract()
            .map_err(Box::new)
    }

    fn figment(config_path: PathBuf) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels, single underscore
            // stays inside field names
            .merge(Env::prefixed("TR_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Find the workspace config by looking for a .tickrag directory
    /// from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(SETTINGS_FILE))
    }

    /// Get the workspace root directory (where .tickrag is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Resolves a configured path against the workspace root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Index directory, resolved against the workspace root.
    #[must_use]
    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.index_path)
    }

    /// Constituents list, resolved against the workspace root.
    #[must_use]
    pub fn records_file(&self) -> PathBuf {
        self.resolve(&self.corpus.records_path)
    }

    /// Directory fastembed caches model files in.
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        if let Some(dir) = &self.semantic.cache_dir {
            return self.resolve(dir);
        }
        dirs::cache_dir()
            .map(|dir| dir.join("tickrag").join("models"))
            .unwrap_or_else(|| self.resolve(&PathBuf::from(CONFIG_DIR).join("models")))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(Path::new("."), force)
    }

    /// Create a default settings file with helpful comments under `root`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = r#"# tickrag configuration file

# Version of the configuration schema
version = 1

# Directory holding vectors.bin, documents.json and metadata.json
# (relative to the workspace root)
index_path = ".tickrag/index"

# Global debug mode
debug = false

[semantic]
# fastembed model used for documents and queries.
# Changing it invalidates the saved index, which is rebuilt on next start.
model = "AllMiniLML6V2"

# Number of search results used to build the context block
top_k = 5

# Texts embedded per model call while building the index
batch_size = 64

# Upper bound on a single async query in milliseconds
query_timeout_ms = 2000

# Model cache directory (defaults to the platform cache directory)
# cache_dir = ".tickrag/models"

[corpus]
# Listing named in document text and the context header
index_name = "S&P 500"

# Cached constituents list. When missing or empty, a built-in list of
# 20 large-cap companies is indexed instead.
records_path = ".tickrag/data/sp500_list.json"

[logging]
# trace, debug, info, warn or error. RUST_LOG overrides this.
level = "info"
"#;

        std::fs::write(&config_path, template)?;
        tracing::info!(path = %config_path.display(), force, "wrote configuration file");

        Ok(config_path)
    }
}
