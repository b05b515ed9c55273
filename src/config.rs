use anyhow::{Context, Result};
use config::{Config as ConfigLoader, Environment, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::defaults;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub openai_base_url: String,
    pub openai_model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            gemini_base_url: defaults::default_gemini_base_url(),
            gemini_model: defaults::default_gemini_model(),
            openai_base_url: defaults::default_openai_base_url(),
            openai_model: defaults::default_openai_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Consult lowercase `https_proxy`/`http_proxy`/`no_proxy` when the
    /// uppercase variables yield no proxy.
    pub platform_fallback: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            platform_fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: String,
    pub request_timeout_secs: u64,
    pub providers: ProviderSettings,
    pub proxy: ProxySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: defaults::default_listen_addr(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
            providers: ProviderSettings::default(),
            proxy: ProxySettings::default(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    let app_config_dir = config_dir.join("llm-relay");
    fs::create_dir_all(&app_config_dir)?;
    Ok(app_config_dir)
}

pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&get_config_file_path()?)
}

/// Layer `path` (optional) and `RELAY_*` environment variables over the defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let loader = ConfigLoader::builder()
        .add_source(File::from(path.to_path_buf()).required(false))
        .add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("reading configuration from {}", path.display()))?;

    let config: AppConfig = loader
        .try_deserialize()
        .with_context(|| format!("parsing configuration from {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(&get_config_file_path()?, config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    let toml = toml::to_string(config)?;
    fs::write(path, toml)?;
    Ok(())
}

pub fn initialize_config() -> Result<()> {
    let config_file = get_config_file_path()?;

    // Create default config if it doesn't exist
    if !config_file.exists() {
        save_config_to(&config_file, &AppConfig::default())?;
    }

    Ok(())
}
