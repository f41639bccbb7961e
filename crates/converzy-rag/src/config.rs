//! Configuration for the question-answering service
//!
//! Built once at startup (TOML file + environment overlay) and handed to the
//! components by value. Nothing here is mutated after `load` returns.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-plan question limits
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Primary provider (OpenAI) configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Alternate provider (Gemini) configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Vector index configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,
    /// Retrieval and prompt configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Turn log / profile storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    ///
    /// When `path` is `None`, `CONVERZY_CONFIG` is consulted. A missing file is
    /// not an error; defaults are used instead.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("CONVERZY_CONFIG").map(PathBuf::from));

        let mut config = match path {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                Self::from_toml(&content)?
            }
            Some(path) => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Overlay credentials and deployment settings from the environment
    fn apply_env(&mut self) {
        if let Some(key) = env_secret("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(key) = env_secret("GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(key) = env_secret("PINECONE_API_KEY") {
            self.vector_db.api_key = Some(key);
        }
        if let Ok(host) = std::env::var("PINECONE_INDEX_HOST") {
            if !host.trim().is_empty() {
                self.vector_db.host = host.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(port) = std::env::var("CONVERZY_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid CONVERZY_PORT value: {}", port),
            }
        }
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        if self.quota.pro_limit <= self.quota.free_limit {
            return Err(Error::Config(format!(
                "quota.pro_limit ({}) must be greater than quota.free_limit ({})",
                self.quota.pro_limit, self.quota.free_limit
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn env_secret(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Header carrying the user id set by the identity provider in front of us
    pub user_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            user_header: "x-user-id".to_string(),
        }
    }
}

/// Questions allowed per document, by plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Limit for users without an active membership
    pub free_limit: usize,
    /// Limit for users with an active membership
    pub pro_limit: usize,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_limit: 2,
            pro_limit: 20,
        }
    }
}

/// OpenAI configuration (primary provider)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL
    pub base_url: String,
    /// Chat completion model
    pub chat_model: String,
    /// Embedding model
    pub embedding_model: String,
    /// Dimensions produced by `embedding_model`
    pub embedding_dimensions: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Service default credential
    #[serde(skip_serializing)]
    pub api_key: Option<SecretString>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_dimensions: 1536,
            temperature: 0.3,
            timeout_secs: 120,
            api_key: None,
        }
    }
}

/// Gemini configuration (alternate provider)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API base URL
    pub base_url: String,
    /// Generation model
    pub chat_model: String,
    /// Embedding model
    pub embedding_model: String,
    /// Dimensions produced by `embedding_model`
    pub embedding_dimensions: usize,
    /// Output token cap
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Service credential; caller-supplied keys are never used for Gemini
    #[serde(skip_serializing)]
    pub api_key: Option<SecretString>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            chat_model: "gemini-1.5-pro".to_string(),
            embedding_model: "embedding-001".to_string(),
            embedding_dimensions: 768,
            max_output_tokens: 2048,
            timeout_secs: 120,
            api_key: None,
        }
    }
}

/// Vector index (Pinecone) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Index host, e.g. `https://docs-abc123.svc.us-east-1.pinecone.io`
    pub host: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// API credential
    #[serde(skip_serializing)]
    pub api_key: Option<SecretString>,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages retrieved per question
    pub top_k: usize,
    /// Prior conversation turns included in the prompt
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            history_turns: 10,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding the turn log and user profiles
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let database_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("converzy")
            .join("chat.db");

        Self { database_path }
    }
}
