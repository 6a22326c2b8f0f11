//! src/config.rs
//! ============================================================================
//! # Config: Client Configuration Loader and Saver
//!
//! Manages the user-editable settings of the Photo Drive client. Loads and
//! saves settings as TOML from the platform config path using the
//! [`directories`](https://docs.rs/directories) crate.
//!
//! ## Features
//! - XDG-compliant config discovery and writing (Linux, macOS, Windows)
//! - Defaults written on first run
//! - Environment overrides for deployment secrets (media preset, API url)
//! - Async load/save for Tokio

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use tokio::fs as TokioFs;

const ENV_API_URL: &str = "PHOTO_DRIVE_API_URL";
const ENV_CLOUD_NAME: &str = "PHOTO_DRIVE_CLOUD_NAME";
const ENV_UPLOAD_PRESET: &str = "PHOTO_DRIVE_UPLOAD_PRESET";

/// Remote resource API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the photo-storage backend, without trailing `/api`
    pub base_url: String,

    /// Transport timeout applied to every request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Media host (Cloudinary unsigned upload) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: String,

    /// Unsigned upload preset configured on the media host
    pub upload_preset: String,

    pub upload_base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            upload_preset: String::new(),
            upload_base_url: "https://api.cloudinary.com/v1_1".to_string(),
        }
    }
}

impl MediaConfig {
    /// Full image upload endpoint for the configured cloud
    #[must_use]
    pub fn upload_endpoint(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.upload_base_url.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

/// Query cache configuration with sensible defaults - embedded in main Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached collections (per resource kind)
    pub max_capacity: u64,

    /// Time-to-live for collections
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Time-to-idle (evict if not accessed)
    #[serde(with = "humantime_serde")]
    pub tti: Duration,

    /// Enable cache statistics
    pub enable_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_024,
            ttl: Duration::from_secs(900), // 15 minutes
            tti: Duration::from_secs(300), // 5 minutes
            enable_stats: true,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,

    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,

    /// Mirror log lines to stderr
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            level: "info".to_string(),
            stderr: false,
        }
    }
}

/// Main configuration struct for the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads config from the app config dir, or writes and returns defaults.
    ///
    /// The config is expected at `$XDG_CONFIG_HOME/PhotoDrive/config.toml`
    /// (Linux), or equivalent on Windows/macOS.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        let mut cfg = Self::load_from(&path).await?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Loads config from an explicit path, creating it with defaults if missing.
    pub async fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            info!("Loading config from {}", path.display());
            let text = TokioFs::read_to_string(path).await?;
            let cfg: Self = toml::from_str(&text)?;

            Ok(cfg)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(path).await?;

            Ok(default_config)
        }
    }

    /// Saves config to the app config dir.
    pub async fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?).await
    }

    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await?;

        Ok(())
    }

    /// Environment values win over the file for deployment-specific settings.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(cloud) = lookup(ENV_CLOUD_NAME) {
            self.media.cloud_name = cloud;
        }
        if let Some(preset) = lookup(ENV_UPLOAD_PRESET) {
            self.media.upload_preset = preset;
        }
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the config directory (without filename).
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "photodrive", "PhotoDrive")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}
