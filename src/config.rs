use crate::agent::Persona;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "CLARITY_CONFIG";
const API_KEY_ENV: &str = "CLARITY_API_KEY";

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    api: ApiConfig,
    #[serde(default)]
    chat: ChatConfig,
    #[serde(default)]
    storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiConfig {
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default)]
    key: String,
    url: Option<String>,
    #[serde(default = "default_model")]
    model: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatConfig {
    #[serde(default)]
    persona: Persona,
    #[serde(default = "default_temperature")]
    temperature: f64,
    max_tokens: Option<u64>,
    #[serde(default)]
    structured_output: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            persona: Persona::default(),
            temperature: default_temperature(),
            max_tokens: None,
            structured_output: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StorageConfig {
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default = "default_true")]
    enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            enabled: true,
        }
    }
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_data_dir() -> String {
    "data".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_provider: String,
    pub api_key: String,
    /// Unset means the provider's own endpoint (Groq for `openai`).
    pub api_url: Option<String>,
    pub model: String,
    pub persona: Persona,
    pub temperature: f64,
    pub max_tokens: u64,
    pub structured_output: bool,
    pub data_dir: PathBuf,
    pub storage_enabled: bool,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_toml(&content, std::env::var(API_KEY_ENV).ok())
    }

    /// Parses a config document. `env_key` is used when `api.key` is empty.
    pub fn from_toml(content: &str, env_key: Option<String>) -> Result<Self> {
        let config_file: ConfigFile =
            toml::from_str(content).context("Failed to parse config file")?;

        let api_key = if config_file.api.key.trim().is_empty() {
            env_key.unwrap_or_default()
        } else {
            config_file.api.key
        };
        if api_key.trim().is_empty() {
            bail!(
                "API key missing: set `api.key` in the config file or the {} environment variable",
                API_KEY_ENV
            );
        }

        let persona = config_file.chat.persona;

        Ok(Self {
            api_provider: config_file.api.provider,
            api_key,
            api_url: config_file.api.url.filter(|url| !url.trim().is_empty()),
            model: config_file.api.model,
            persona,
            temperature: config_file.chat.temperature,
            max_tokens: config_file
                .chat
                .max_tokens
                .unwrap_or_else(|| persona.default_max_tokens()),
            structured_output: config_file.chat.structured_output,
            data_dir: config_file.storage.data_dir.into(),
            storage_enabled: config_file.storage.enabled,
        })
    }

    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&path)
    }
}
