use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LibraryConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub cache: CacheConfig,
    pub persona: PersonaConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub query_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub max_tool_rounds: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PersonaConfig {
    /// The person the persona speaks on behalf of.
    pub owner_name: String,
    pub library_name: String,
    /// Plain-text career summary.
    pub summary_path: String,
    /// Text already extracted from the career profile document.
    pub profile_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7860,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_library_dir()
            .join("library.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            query_timeout_ms: 5_000,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            request_timeout_ms: 60_000,
            max_tool_rounds: 8,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        let me = default_library_dir().join("me");
        Self {
            owner_name: "Bradley Watkins".into(),
            library_name: "Llyfrgell Woko".into(),
            summary_path: me.join("summary.txt").to_string_lossy().into_owned(),
            profile_path: me.join("profile.txt").to_string_lossy().into_owned(),
        }
    }
}

/// Returns `~/.llyfrgell/`
pub fn default_library_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".llyfrgell")
}

/// Returns the default config file path: `~/.llyfrgell/config.toml`
pub fn default_config_path() -> PathBuf {
    default_library_dir().join("config.toml")
}

impl LibraryConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            LibraryConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// `LLYFRGELL_DB`, `LLYFRGELL_LOG_LEVEL`, `LLYFRGELL_MODEL`, `OPENAI_BASE_URL`,
    /// `OPENAI_API_KEY`.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LLYFRGELL_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("LLYFRGELL_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("LLYFRGELL_MODEL") {
            self.model.model = val;
        }
        if let Ok(val) = std::env::var("OPENAI_BASE_URL") {
            self.model.base_url = val;
        }
        if let Some(val) = std::env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty()) {
            self.model.api_key = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.query_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
