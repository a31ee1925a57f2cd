//! Configuration management.
//!
//! Loads configuration from a TOML file and provides runtime defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            timing: TimingConfig::default(),
            image: ImageConfig::default(),
            optimizer: OptimizerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the daemon is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Seconds between clipboard change-counter polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Maximum output width in pixels; wider images are scaled down
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// JPEG compression factor in [0, 1] for the pre-optimizer encode
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: 1600,
            jpeg_quality: 0.85,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Name of the optimizer executable to search for on PATH
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Hard quality ceiling passed to the optimizer, independent of the
    /// pre-encode quality
    #[serde(default = "default_quality_ceiling")]
    pub quality_ceiling: u8,

    /// Explicit path to the optimizer binary, bypassing the PATH search
    #[serde(default)]
    pub binary_path: Option<PathBuf>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            binary_name: "jpegoptim".to_string(),
            quality_ceiling: 70,
            binary_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How many cached files "recent" queries and republishing cover
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Cache directory override; defaults to a directory under the system
    /// temp dir
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            recent_limit: 20,
            directory: None,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    1
}

fn default_max_width() -> u32 {
    1600
}

fn default_jpeg_quality() -> f32 {
    0.85
}

fn default_binary_name() -> String {
    "jpegoptim".to_string()
}

fn default_quality_ceiling() -> u8 {
    70
}

fn default_recent_limit() -> usize {
    20
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("phototray")
            .join("config.toml")
    }

    /// Save configuration to the default path
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to_path(Self::default_config_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// The cache directory: the configured override, or a scoped directory
    /// under the system temp dir
    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .directory
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("phototray"))
    }

    /// Poll interval as a `Duration`, never shorter than one second
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.timing.poll_interval_seconds.max(1))
    }
}
