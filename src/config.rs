use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const API_BASE_TVDB: &str = "https://api.thetvdb.com";
pub const API_BASE_FALLBACK: &str = "https://tvdb2.plex.tv";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Language used for every request. When unset the show's own language is used.
    #[serde(default = "default_language")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_mirror_base_url")]
    pub mirror_base_url: String,
    /// Artwork URL template, `{}` is replaced by the relative image path.
    #[serde(default = "default_artwork_prefix")]
    pub artwork_prefix: String,
    #[serde(default)]
    pub dvd_order: bool,
    #[serde(default = "default_true")]
    pub episodes_enabled: bool,
    #[serde(default)]
    pub banners_enabled: bool,
    #[serde(default)]
    pub actors_enabled: bool,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fallback_timeout")]
    pub timeout_hours: f64,
    #[serde(default = "default_true")]
    pub notifications: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub desktop: bool,
}

fn default_language() -> Option<String> {
    Some("en".to_string())
}

fn default_api_base_url() -> String {
    API_BASE_TVDB.to_string()
}

fn default_mirror_base_url() -> String {
    API_BASE_FALLBACK.to_string()
}

fn default_artwork_prefix() -> String {
    "https://thetvdb.com/banners/{}".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fallback_timeout() -> f64 {
    3.0
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_api_base_url(),
            mirror_base_url: default_mirror_base_url(),
            artwork_prefix: default_artwork_prefix(),
            dvd_order: false,
            episodes_enabled: true,
            banners_enabled: false,
            actors_enabled: false,
            image_type: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_hours: default_fallback_timeout(),
            notifications: true,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "tvdb-indexer").ok_or(Error::NoConfigDir)
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn data_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .map_err(|_| Error::NoDataDir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load from `path`, writing the defaults there first if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
