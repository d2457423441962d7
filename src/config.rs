use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, RetrievalError};

/// Prompt used by the bundled Ollama completion step
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{context}\n\nQuestion: {question}\nHelpful Answer:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Where declarations come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// TOML manifest with knowledge bases, embedders, indexes and retrievers
    pub manifest: Option<PathBuf>,
    /// Namespace used when a reference does not name one
    pub app_namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            app_namespace: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Separator placed between joined documents
    pub separator: String,
    /// Per-request HTTP timeout
    pub http_timeout_secs: u64,
    /// Deadline for a whole resolve + answer call
    pub deadline_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            separator: "\n\n".to_string(),
            http_timeout_secs: 30,
            deadline_secs: 120,
        }
    }
}

impl RetrievalSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub ollama_url: String,
    pub model: String,
    pub prompt_template: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://127.0.0.1:11434".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RetrievalError::Io(e).context(format!("read config {}", path.display()))
        })?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| RetrievalError::Toml(e).context(format!("parse config {}", path.display())))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| RetrievalError::Configuration(format!("serialize config: {}", e)))?;

        fs::write(path, toml_string)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            RetrievalError::Configuration("could not determine home directory".to_string())
        })?;

        Ok(home.join(".kb-retriever").join("config.toml"))
    }

    /// Manifest path, resolved relative to the config file's directory
    pub fn manifest_path(&self, config_file: Option<&Path>) -> Option<PathBuf> {
        let manifest = self.store.manifest.as_ref()?;
        if manifest.is_absolute() {
            return Some(manifest.clone());
        }
        match config_file.and_then(Path::parent) {
            Some(dir) => Some(dir.join(manifest)),
            None => Some(manifest.clone()),
        }
    }
}
