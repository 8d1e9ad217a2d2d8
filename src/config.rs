use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the generation backend URL.
pub const OLLAMA_URL_ENV: &str = "DOCQA_OLLAMA_URL";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub staging: StagingConfig,
    pub index: IndexConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StagingConfig {
    pub dir: PathBuf,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub dir: PathBuf,
    /// Snapshot name; the on-disk artifact is `<dir>/<name>.sqlite`.
    pub name: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./index"),
            name: "main".to_string(),
        }
    }
}

impl IndexConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(format!("{}.sqlite", self.name))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap_chars: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `local`, `ollama`, or `disabled`.
    pub provider: String,
    pub model: Option<String>,
    pub dims: Option<usize>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Base URL for the `ollama` provider.
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
            url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    /// Base URL of the Ollama backend. `DOCQA_OLLAMA_URL` overrides it.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-r1:1.5b".to_string(),
            url: None,
            timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    pub fn base_url(&self) -> &str {
        self.url.as_deref().unwrap_or("http://localhost:11434")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7878".to_string(),
        }
    }
}

/// Load configuration from a TOML file and validate it.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Load configuration from `path` if it exists, otherwise fall back to
/// built-in defaults so the tool works without a config file.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        validate(&config)?;
        Ok(config)
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(url) = std::env::var(OLLAMA_URL_ENV) {
        if !url.trim().is_empty() {
            config.generation.url = Some(url);
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!("chunking.overlap_chars must be smaller than chunking.max_chars");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "local" | "disabled" => {}
        "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified for the ollama provider");
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0 for the ollama provider");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, ollama, or disabled.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_pipeline() {
        let config = Config::default();
        assert_eq!(config.chunking.max_chars, 1000);
        assert_eq!(config.chunking.overlap_chars, 100);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.generation.base_url(), "http://localhost:11434");
    }

    #[test]
    fn snapshot_path_combines_dir_and_name() {
        let index = IndexConfig {
            dir: PathBuf::from("/tmp/idx"),
            name: "main".to_string(),
        };
        assert_eq!(index.snapshot_path(), PathBuf::from("/tmp/idx/main.sqlite"));
    }

    #[test]
    fn overlap_must_be_smaller_than_max() {
        let mut config = Config::default();
        config.chunking.overlap_chars = config.chunking.max_chars;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = Config::default();
        config.embedding.provider = "mystery".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn ollama_provider_requires_model_and_dims() {
        let mut config = Config::default();
        config.embedding.provider = "ollama".to_string();
        assert!(validate(&config).is_err());

        config.embedding.model = Some("nomic-embed-text".to_string());
        config.embedding.dims = Some(768);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            max_chars = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.max_chars, 500);
        assert_eq!(config.chunking.overlap_chars, 100);
        assert_eq!(config.retrieval.top_k, 3);
    }
}
