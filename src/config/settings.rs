use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RelayError, Result};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://192.168.0.37:11434/api";
pub const OLLAMA_BASE_URL_ENV: &str = "OLLAMA_BASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://web01.muthur.net".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

impl Settings {
    /// Defaults, then the first config file found, then `OLLAMA_BASE_URL`.
    pub fn load() -> Result<Self> {
        let mut settings = match Self::find_config_file() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_base_url_override(std::env::var(OLLAMA_BASE_URL_ENV).ok());
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Empty or whitespace-only values leave the configured URL untouched.
    pub fn apply_base_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|v| v.trim().to_string())
            && !url.is_empty()
        {
            self.upstream.base_url = url;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn find_config_file() -> Option<&'static str> {
        let possible_names = ["relay-config.toml", "config.toml"];
        possible_names
            .into_iter()
            .find(|name| Path::new(name).exists())
    }
}
