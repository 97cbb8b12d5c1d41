//! Client config load/save for `~/.learnmate/config.yaml`.
//! The API key may also come from the `GEMINI_API_KEY` environment variable;
//! a key from neither source is fatal at startup.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// Default model when the config does not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default API endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// API section (api_key, model, base_url).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Storage section (directory holding persisted chat history).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StorageSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// Full config file contents.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub storage: StorageSection,
}

/// Config values with defaults and the environment fallback applied.
#[derive(Debug, Clone)]
pub struct ResolvedApi {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Config {
    /// Apply defaults and the `GEMINI_API_KEY` fallback. Errors when no API
    /// key can be found anywhere.
    pub fn resolve_api(&self) -> Result<ResolvedApi, Error> {
        let api_key = self
            .api
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(
                    "no API key: set api.api_key in the config file or the GEMINI_API_KEY \
                     environment variable"
                        .into(),
                )
            })?;
        Ok(ResolvedApi {
            api_key,
            model: self.api.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            base_url: self
                .api
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
        })
    }

    /// Directory for persisted state: `storage.dir` or `~/.learnmate`.
    pub fn storage_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.storage.dir {
            return Some(PathBuf::from(dir));
        }
        default_config_dir()
    }
}

/// Returns the default config directory: `~/.learnmate` (platform-specific).
pub fn default_config_dir() -> Option<PathBuf> {
    Some(home_dir()?.join(".learnmate"))
}

/// Returns the default config file path: `~/.learnmate/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    Some(default_config_dir()?.join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
    serde_yaml::from_str(&contents)
        .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Configuration(e.to_string()))?;
        }
    }
    let contents =
        serde_yaml::to_string(config).map_err(|e| Error::Configuration(e.to_string()))?;
    std::fs::write(path, contents).map_err(|e| Error::Configuration(e.to_string()))
}
