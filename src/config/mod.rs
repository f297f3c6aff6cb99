//! Configuration management for nutriplan
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// LLM endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Plan generation configuration
    #[serde(default)]
    pub plan: PlanConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "BAAI/bge-small-en-v1.5" => Some(384),
        "BAAI/bge-base-en-v1.5" => Some(768),
        "BAAI/bge-large-en-v1.5" => Some(1024),
        "sentence-transformers/all-MiniLM-L6-v2" => Some(384),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Resolve the effective embedding dimension based on the configured model
    pub fn resolved_dimension(&self) -> usize {
        if let Some(expected) = embedding_dimension_for_model(&self.model) {
            if expected != self.dimension {
                warn!(
                    "Embedding dimension {} does not match model '{}' ({}); using {}",
                    self.dimension, self.model, expected, expected
                );
            }
            expected
        } else {
            self.dimension
        }
    }
}

/// Chunking configuration (word-window chunker)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Words per chunk
    #[serde(default = "default_chunk_size_words")]
    pub size_words: usize,

    /// Overlap words between consecutive chunks
    #[serde(default = "default_chunk_overlap_words")]
    pub overlap_words: usize,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of results
    #[serde(default = "default_query_k")]
    pub default_k: usize,

    /// Maximum results allowed per query
    #[serde(default = "default_query_max_k")]
    pub max_k: usize,

    /// Minimum similarity score (0.0 - 1.0)
    #[serde(default = "default_query_min_score")]
    pub min_score: f32,
}

/// LLM endpoint configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the chat completions server
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier passed in the request body
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

/// Plan generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// How many days ahead of today a target date may be
    #[serde(default = "default_plan_max_days_ahead")]
    pub max_days_ahead: i64,

    /// Lookback window (days) for the variety avoid-list
    #[serde(default = "default_plan_avoid_window_days")]
    pub avoid_window_days: i64,

    /// Context chunks included in a diet prompt
    #[serde(default = "default_plan_diet_context_chunks")]
    pub diet_context_chunks: usize,

    /// Context chunks included in an exercise prompt
    #[serde(default = "default_plan_exercise_context_chunks")]
    pub exercise_context_chunks: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for nutriplan data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,

    /// Directory holding original uploaded files
    pub uploads_dir: PathBuf,

    /// Directory holding extracted text copies
    pub texts_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            collection_name: default_collection_name(),
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            query: QueryConfig::default(),
            llm: LlmConfig::default(),
            plan: PlanConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size_words: default_chunk_size_words(),
            overlap_words: default_chunk_overlap_words(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: default_query_k(),
            max_k: default_query_max_k(),
            min_score: default_query_min_score(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            max_days_ahead: default_plan_max_days_ahead(),
            avoid_window_days: default_plan_avoid_window_days(),
            diet_context_chunks: default_plan_diet_context_chunks(),
            exercise_context_chunks: default_plan_exercise_context_chunks(),
        }
    }
}

impl Config {
    /// Get the default base directory for nutriplan (~/.nutriplan)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nutriplan")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("registry.db"),
            uploads_dir: base.join("uploads"),
            texts_dir: base.join("texts"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Set up paths based on config file location
        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("registry.db"),
            uploads_dir: base.join("uploads"),
            texts_dir: base.join("texts"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
            config.validate()?;
        } else {
            debug!("No config file found, using defaults");
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Create the data directories this config points at
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.paths.base_dir)?;
        std::fs::create_dir_all(&self.paths.uploads_dir)?;
        std::fs::create_dir_all(&self.paths.texts_dir)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.size_words == 0 {
            return Err(Error::Config(
                "chunk.size_words must be positive".to_string(),
            ));
        }

        if self.chunk.overlap_words >= self.chunk.size_words {
            return Err(Error::Config(
                "chunk.overlap_words must be < chunk.size_words".to_string(),
            ));
        }

        if self.query.default_k == 0 || self.query.default_k > self.query.max_k {
            return Err(Error::Config(format!(
                "query.default_k must be between 1 and {}",
                self.query.max_k
            )));
        }

        if self.query.min_score < 0.0 || self.query.min_score > 1.0 {
            return Err(Error::Config(
                "query.min_score must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(Error::Config("llm.timeout_secs must be positive".to_string()));
        }

        if self.plan.max_days_ahead < 0 {
            return Err(Error::Config(
                "plan.max_days_ahead must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.collection_name, "nutriplan_chunks");
        assert_eq!(config.chunk.size_words, 350);
        assert_eq!(config.chunk.overlap_words, 80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.collection_name = "test_collection".to_string();

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.collection_name, "test_collection");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // Invalid: overlap >= size
        config.chunk.overlap_words = config.chunk.size_words;
        assert!(config.validate().is_err());

        // Fix it
        config.chunk.overlap_words = 80;
        assert!(config.validate().is_ok());

        // Invalid: default_k above the cap
        config.query.default_k = config.query.max_k + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolved_dimension_matches_model() {
        let mut config = Config::default();
        config.embedding.model = "BAAI/bge-base-en-v1.5".to_string();
        // Intentionally wrong dimension to ensure resolver corrects it
        config.embedding.dimension = 384;

        assert_eq!(config.embedding.resolved_dimension(), 768);
    }

    #[test]
    fn test_resolved_dimension_unknown_model_falls_back() {
        let mut config = Config::default();
        config.embedding.model = "custom-model".to_string();
        config.embedding.dimension = 512;

        assert_eq!(config.embedding.resolved_dimension(), 512);
    }
}
