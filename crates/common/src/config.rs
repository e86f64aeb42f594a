//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SuncastError, SuncastResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote archive settings.
    pub archive: ArchiveConfig,

    /// Frame assembly settings.
    pub render: RenderConfig,

    /// Publishing settings.
    pub publish: PublishConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Where frames come from and how politely we fetch them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Scheme and host of the image archive.
    pub base_url: String,

    /// Substring an anchor `href` must contain to be treated as a frame.
    pub frame_marker: String,

    /// Maximum number of frames per animation.
    pub frame_limit: usize,

    /// Timeout for fetching the daily index page.
    pub index_timeout_secs: u64,

    /// Attempts for the index fetch before giving up.
    pub index_attempts: u32,

    /// Minimum spacing between frame downloads.
    pub politeness_delay_ms: u64,

    /// How far behind "now" the run's time window is anchored.
    pub publication_lag_minutes: i64,

    /// User-Agent sent to the archive.
    pub user_agent: String,
}

/// External tool settings for assembling the animation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Animation encoder binary (ImageMagick `convert`).
    pub encoder: String,

    /// Size optimizer binary (`gifsicle`).
    pub optimizer: String,

    /// Per-frame delay in hundredths of a second.
    pub frame_delay_cs: u32,

    /// Palette cap handed to the optimizer.
    pub colors: u32,

    /// Optimizer level (gifsicle `--optimize=N`).
    pub optimize_level: u8,
}

/// Publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Attempts for the combined upload + post.
    pub attempts: u32,

    /// REST API base.
    pub api_base: String,

    /// Media upload API base.
    pub upload_base: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "suncast=debug,warn").
    pub level: String,

    /// Whether the log file gets structured JSON lines.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sdo.gsfc.nasa.gov".to_string(),
            frame_marker: "_1024_0193.jpg".to_string(),
            frame_limit: 32,
            index_timeout_secs: 5 * 60,
            index_attempts: 3,
            politeness_delay_ms: 250,
            publication_lag_minutes: 10,
            user_agent: concat!("suncast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            encoder: "convert".to_string(),
            optimizer: "gifsicle".to_string(),
            frame_delay_cs: 15,
            colors: 256,
            optimize_level: 3,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            api_base: "https://api.twitter.com".to_string(),
            upload_base: "https://upload.twitter.com".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> SuncastResult<Self> {
        if !path.exists() {
            return Err(SuncastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// A validated working directory holding the durable `originals/` frame
/// cache and the `gifs/` artifact output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub const ORIGINALS: &'static str = "originals";
    pub const GIFS: &'static str = "gifs";

    /// Both subdirectories must already exist.
    pub fn open(root: impl Into<PathBuf>) -> SuncastResult<Self> {
        let root = root.into();
        let work_dir = Self { root };
        if !work_dir.originals().is_dir() || !work_dir.gifs().is_dir() {
            return Err(SuncastError::config(format!(
                "working directory {} requires '{}' and '{}' subdirectories to exist",
                work_dir.root.display(),
                Self::ORIGINALS,
                Self::GIFS
            )));
        }
        Ok(work_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Durable raw-frame cache.
    pub fn originals(&self) -> PathBuf {
        self.root.join(Self::ORIGINALS)
    }

    /// Durable artifact output.
    pub fn gifs(&self) -> PathBuf {
        self.root.join(Self::GIFS)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("suncast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"archive": {"frame_limit": 8}}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.archive.frame_limit, 8);
        assert_eq!(config.archive.frame_marker, "_1024_0193.jpg");
        assert_eq!(config.render.frame_delay_cs, 15);
        assert_eq!(config.publish.attempts, 3);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = AppConfig::load_from(Path::new("/nonexistent/suncast.json")).unwrap_err();
        assert!(matches!(err, SuncastError::FileNotFound { .. }));
    }

    #[test]
    fn test_work_dir_requires_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WorkDir::open(dir.path()).is_err());

        std::fs::create_dir(dir.path().join("originals")).unwrap();
        assert!(WorkDir::open(dir.path()).is_err());

        std::fs::create_dir(dir.path().join("gifs")).unwrap();
        let work_dir = WorkDir::open(dir.path()).unwrap();
        assert_eq!(work_dir.gifs(), dir.path().join("gifs"));
        assert_eq!(work_dir.originals(), dir.path().join("originals"));
    }
}
