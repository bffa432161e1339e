use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorSettings,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    /// Spawn a still-capture program per frame.
    Command,
    /// Fetch a still frame over HTTP.
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_source")]
    pub source: CameraSource,
    #[serde(default = "default_program")]
    pub program: String,
    /// Argument templates; `{width}`, `{height}` and `{output}` are substituted.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_test_width")]
    pub width: u32,
    #[serde(default = "default_test_height")]
    pub height: u32,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSettings {
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u64,
    /// `[[x_min, x_max], [y_min, y_max]]`, 1-based and inclusive.
    #[serde(default)]
    pub regions: Vec<[[u32; 2]; 2]>,
    #[serde(default)]
    pub diagnostics: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub full_width: Option<u32>,
    #[serde(default)]
    pub full_height: Option<u32>,
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
    /// Preferred over `local_dir` whenever it is currently writable.
    #[serde(default)]
    pub remote_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebugConfig {
    /// Where the debug overlay is written when diagnostics are on.
    #[serde(default)]
    pub overlay_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            program: default_program(),
            args: default_args(),
            url: None,
            width: default_test_width(),
            height: default_test_height(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            sensitivity: default_sensitivity(),
            regions: Vec::new(),
            diagnostics: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CameraConfig {
    /// Resolution of the frames fed to the comparator.
    pub fn test_resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }
}

impl SnapshotConfig {
    /// Resolution for motion snapshots. `None` disables snapshots.
    pub fn full_resolution(&self) -> Option<Resolution> {
        match (self.full_width, self.full_height) {
            (Some(width), Some(height)) => Some(Resolution { width, height }),
            _ => None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parses and validates a TOML document, expanding `~` in directories.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        config.expand_dirs();
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.source == CameraSource::Http && self.camera.url.is_none() {
            return Err(ConfigError::Invalid(
                "camera.url is required when camera.source = \"http\"".into(),
            ));
        }
        if self.camera.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "camera.poll_interval_secs must be at least 1".into(),
            ));
        }
        if self.snapshot.full_width.is_some() != self.snapshot.full_height.is_some() {
            return Err(ConfigError::Invalid(
                "snapshot.full_width and snapshot.full_height must be set together".into(),
            ));
        }
        Ok(())
    }

    fn expand_dirs(&mut self) {
        for dir in [
            &mut self.snapshot.local_dir,
            &mut self.snapshot.remote_dir,
            &mut self.debug.overlay_path,
        ]
        .into_iter()
        .flatten()
        {
            *dir = expand_home(dir.as_path());
        }
    }
}

/// Replaces a leading `~` with the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_source() -> CameraSource {
    CameraSource::Command
}
fn default_program() -> String {
    "fswebcam".into()
}
fn default_args() -> Vec<String> {
    ["--no-banner", "-r", "{width}x{height}", "--jpeg", "95", "{output}"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_test_width() -> u32 {
    320
}
fn default_test_height() -> u32 {
    240
}
fn default_poll_interval() -> u64 {
    5
}
fn default_threshold() -> u8 {
    30
}
fn default_sensitivity() -> u64 {
    20
}
fn default_log_level() -> String {
    "info".into()
}
