//! Configuration management for ragline.
//!
//! Configuration is merged from several layers, lowest precedence first:
//! - Built-in defaults
//! - A YAML config file (`ragline.yaml`, or the path given by `RAGLINE_CONFIG` / `--config`)
//! - Environment variables
//! - Command-line flags
//!
//! Clients are constructed once from the final configuration and shared by
//! every pipeline invocation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "ragline.yaml";

/// Known embedding providers.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["gemini", "ollama", "mock"];

/// Known language model providers.
pub const LLM_PROVIDERS: [&str; 3] = ["openai", "groq", "ollama"];

/// Distance metric of a vector collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    /// Parse a metric name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(Self::Cosine),
            "dot" => Some(Self::Dot),
            "euclid" | "euclidean" | "l2" => Some(Self::Euclid),
            _ => None,
        }
    }

    /// Canonical metric name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Dot => "dot",
            Self::Euclid => "euclid",
        }
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit the chunker counts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    Sentence,
    #[default]
    Word,
}

impl ChunkUnit {
    /// Parse a unit name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sentence" | "sentences" => Some(Self::Sentence),
            "word" | "words" | "token" | "tokens" => Some(Self::Word),
            _ => None,
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Qdrant,
    LanceDb,
    Memory,
}

impl StoreBackend {
    /// Parse a backend name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "qdrant" => Some(Self::Qdrant),
            "lancedb" => Some(Self::LanceDb),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Config file the values were loaded from, if any
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Verbose mode (enables debug logging)
    #[serde(skip)]
    pub verbose: bool,

    pub logging: LoggingSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub llm: LlmSettings,
    pub chunking: ChunkingSettings,
    pub query: QuerySettings,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. "info" or "ragline_knowledge=debug"
    pub level: Option<String>,

    /// Disable colored output
    pub no_color: bool,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider name: "gemini", "ollama", "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Vector dimension shared by the provider and the collection
    pub dimensions: usize,

    /// Maximum number of texts per provider call
    pub batch_size: usize,

    /// Custom endpoint (defaults to the provider's public endpoint)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-embedding-001".to_string(),
            dimensions: 3072,
            batch_size: 100,
            endpoint: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,

    /// Qdrant gRPC URL
    pub url: String,

    /// LanceDB directory
    pub path: PathBuf,

    /// Collection (Qdrant) or table (LanceDB) name
    pub collection: String,

    pub distance: Distance,

    /// Environment variable holding the Qdrant API key, if the server requires one
    pub api_key_env: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Qdrant,
            url: "http://localhost:6334".to_string(),
            path: PathBuf::from(".ragline/lancedb"),
            collection: "docs".to_string(),
            distance: Distance::Cosine,
            api_key_env: None,
            timeout_secs: 30,
        }
    }
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider name: "openai" (any OpenAI-compatible API), "groq", "ollama"
    pub provider: String,

    pub model: String,

    /// Base URL of the API
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            endpoint: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub unit: ChunkUnit,

    /// Maximum units per chunk
    pub chunk_size: usize,

    /// Units shared by consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            unit: ChunkUnit::Word,
            chunk_size: 512,
            overlap: 64,
        }
    }
}

/// Query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// top_k used when the caller does not pass one
    pub default_top_k: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}

impl AppConfig {
    /// Load configuration from the config file and the process environment.
    ///
    /// # Example
    /// ```no_run
    /// use ragline_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Collection: {}", config.store.collection);
    /// ```
    pub fn load(config_file: Option<PathBuf>) -> AppResult<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Load configuration, reading environment variables through `lookup`.
    pub fn load_with<F>(config_file: Option<PathBuf>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit = config_file.or_else(|| lookup("RAGLINE_CONFIG").map(PathBuf::from));
        let config_path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
            config.config_file = Some(config_path);
        } else if explicit.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        config.apply_env(&lookup)?;

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    ///
    /// Sections present in the file replace the current ones; fields missing
    /// from a section take their defaults.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(logging) = file.logging {
            result.logging = logging;
        }
        if let Some(embedding) = file.embedding {
            result.embedding = embedding;
        }
        if let Some(store) = file.store {
            result.store = store;
        }
        if let Some(llm) = file.llm {
            result.llm = llm;
        }
        if let Some(chunking) = file.chunking {
            result.chunking = chunking;
        }
        if let Some(query) = file.query {
            result.query = query;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply environment variable overrides.
    fn apply_env<F>(&mut self, lookup: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("RAGLINE_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = lookup("RAGLINE_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dim) = lookup("RAGLINE_EMBEDDING_DIM") {
            self.embedding.dimensions = parse_number("RAGLINE_EMBEDDING_DIM", &dim)?;
        }
        if let Some(backend) = lookup("RAGLINE_STORE_BACKEND") {
            self.store.backend = StoreBackend::parse(&backend).ok_or_else(|| {
                AppError::Config(format!(
                    "Unknown store backend: {}. Supported: qdrant, lancedb, memory",
                    backend
                ))
            })?;
        }
        if let Some(url) = lookup("RAGLINE_QDRANT_URL") {
            self.store.url = url;
        }
        if let Some(collection) = lookup("RAGLINE_COLLECTION") {
            self.store.collection = collection;
        }
        if let Some(provider) = lookup("RAGLINE_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("RAGLINE_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(size) = lookup("RAGLINE_CHUNK_SIZE") {
            self.chunking.chunk_size = parse_number("RAGLINE_CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = lookup("RAGLINE_CHUNK_OVERLAP") {
            self.chunking.overlap = parse_number("RAGLINE_CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(top_k) = lookup("RAGLINE_TOP_K") {
            self.query.default_top_k = parse_number("RAGLINE_TOP_K", &top_k)?;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            self.logging.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(log_level) = log_level {
            self.logging.level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.logging.level.is_none() {
                self.logging.level = Some("debug".to_string());
            }
        }

        if no_color {
            self.logging.no_color = true;
        }

        if json_logs {
            self.logging.json = true;
        }

        self
    }

    /// Read a secret from the named environment variable.
    pub fn resolve_secret(env_var: &str) -> Option<String> {
        std::env::var(env_var).ok().filter(|value| !value.is_empty())
    }

    /// API key for the embedding provider, if one is set.
    pub fn embedding_api_key(&self) -> Option<String> {
        Self::resolve_secret(&self.embedding.api_key_env)
    }

    /// API key for the language model provider, if one is set.
    pub fn llm_api_key(&self) -> Option<String> {
        Self::resolve_secret(&self.llm.api_key_env)
    }

    /// API key for the vector store, if one is configured.
    pub fn store_api_key(&self) -> Option<String> {
        self.store
            .api_key_env
            .as_deref()
            .and_then(Self::resolve_secret)
    }

    /// Validate the configuration.
    ///
    /// Every violation here is fatal: retrying cannot fix a bad config.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunking.chunk_size == 0 {
            return Err(AppError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be less than chunk_size ({})",
                self.chunking.overlap, self.chunking.chunk_size
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding batch_size must be greater than zero".to_string(),
            ));
        }

        if self.query.default_top_k == 0 {
            return Err(AppError::Config(
                "default_top_k must be greater than zero".to_string(),
            ));
        }

        if self.store.collection.trim().is_empty() {
            return Err(AppError::Config(
                "collection name must not be empty".to_string(),
            ));
        }

        for (name, secs) in [
            ("embedding", self.embedding.timeout_secs),
            ("store", self.store.timeout_secs),
            ("llm", self.llm.timeout_secs),
        ] {
            if secs == 0 {
                return Err(AppError::Config(format!(
                    "{} timeout_secs must be greater than zero",
                    name
                )));
            }
        }

        let provider = self.embedding.provider.to_lowercase();
        if !EMBEDDING_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let provider = self.llm.provider.to_lowercase();
        if !LLM_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                LLM_PROVIDERS.join(", ")
            )));
        }

        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    logging: Option<LoggingSettings>,
    embedding: Option<EmbeddingSettings>,
    store: Option<StoreSettings>,
    llm: Option<LlmSettings>,
    chunking: Option<ChunkingSettings>,
    query: Option<QuerySettings>,
}

fn parse_number(name: &str, value: &str) -> AppResult<usize> {
    value.trim().parse().map_err(|_| {
        AppError::Config(format!(
            "{} must be a non-negative integer, got {:?}",
            name, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.provider, "gemini");
        assert_eq!(config.embedding.dimensions, 3072);
        assert_eq!(config.store.collection, "docs");
        assert_eq!(config.store.distance, Distance::Cosine);
        assert_eq!(config.query.default_top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = AppConfig::default();
        config.chunking.chunk_size = 10;
        config.chunking.overlap = 10;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = AppConfig::default();
        config.chunking.chunk_size = 0;
        config.chunking.overlap = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut config = AppConfig::default();
        config.embedding.dimensions = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.store.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("store timeout_secs"));
    }

    #[test]
    fn test_unknown_providers_rejected() {
        let mut config = AppConfig::default();
        config.embedding.provider = "word2vec".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.yaml");
        std::fs::write(&path, "{}\n").unwrap();

        let lookup = env(&[
            ("RAGLINE_COLLECTION", "papers"),
            ("RAGLINE_EMBEDDING_DIM", "768"),
            ("RAGLINE_STORE_BACKEND", "memory"),
            ("RAGLINE_TOP_K", "8"),
            ("RAGLINE_CHUNK_SIZE", "100"),
            ("RAGLINE_CHUNK_OVERLAP", "10"),
        ]);

        let config = AppConfig::load_with(Some(path), lookup).unwrap();
        assert_eq!(config.store.collection, "papers");
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.query.default_top_k, 8);
        assert_eq!(config.chunking.chunk_size, 100);
        assert_eq!(config.chunking.overlap, 10);
    }

    #[test]
    fn test_invalid_env_number() {
        let lookup = env(&[("RAGLINE_CHUNK_SIZE", "large")]);
        let err = AppConfig::load_with(None, lookup).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("RAGLINE_CHUNK_SIZE"));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.yaml");
        let result = AppConfig::load_with(Some(path), env(&[]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_yaml_merge_and_env_precedence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ragline.yaml");
        std::fs::write(
            &path,
            r#"
embedding:
  provider: ollama
  model: nomic-embed-text
  dimensions: 768
store:
  backend: lancedb
  collection: handbook
chunking:
  unit: sentence
  chunk_size: 8
  overlap: 2
"#,
        )
        .unwrap();

        let lookup = env(&[("RAGLINE_COLLECTION", "override")]);
        let config = AppConfig::load_with(Some(path.clone()), lookup).unwrap();

        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.dimensions, 768);
        // Fields missing from a section fall back to defaults
        assert_eq!(config.embedding.batch_size, 100);
        assert_eq!(config.store.backend, StoreBackend::LanceDb);
        assert_eq!(config.store.collection, "override");
        assert_eq!(config.chunking.unit, ChunkUnit::Sentence);
        assert_eq!(config.chunking.chunk_size, 8);
        // Untouched sections keep defaults
        assert_eq!(config.query.default_top_k, 5);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(None, true, true, false);

        assert!(config.verbose);
        assert!(config.logging.no_color);
        assert_eq!(config.logging.level, Some("debug".to_string()));
    }

    #[test]
    fn test_distance_parsing() {
        assert_eq!(Distance::parse("COSINE"), Some(Distance::Cosine));
        assert_eq!(Distance::parse("l2"), Some(Distance::Euclid));
        assert_eq!(Distance::parse("manhattan"), None);
        assert_eq!(ChunkUnit::parse("sentences"), Some(ChunkUnit::Sentence));
        assert_eq!(StoreBackend::parse("LanceDB"), Some(StoreBackend::LanceDb));
    }
}
