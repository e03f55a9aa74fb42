use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the exif-scrub library.
///
/// Controls how metadata is removed, where clean copies are written,
/// how deep the undo history goes, and how many files are processed at once.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_scrub::config::{Config, StripMode};
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.strip.mode = StripMode::Lossless;
/// config.output.in_place = true;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How metadata is removed.
    pub strip: StripConfig,
    /// Where and how clean copies are written.
    pub output: OutputConfig,
    /// Undo/redo history settings for interactive sessions.
    pub history: HistoryConfig,
    /// Maximum number of images processed concurrently in batch mode.
    pub jobs: usize,
}

/// The strategy used to produce a metadata-free copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripMode {
    /// Decode the pixels and encode a brand-new file. Nothing but pixels survives.
    Reencode,
    /// Remove metadata segments/chunks and keep the compressed image data as is.
    Lossless,
}

impl std::fmt::Display for StripMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reencode => f.write_str("reencode"),
            Self::Lossless => f.write_str("lossless"),
        }
    }
}

impl std::str::FromStr for StripMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reencode" | "re-encode" => Ok(Self::Reencode),
            "lossless" => Ok(Self::Lossless),
            other => anyhow::bail!("Unknown strip mode '{other}' (expected 'reencode' or 'lossless')"),
        }
    }
}

/// Controls the stripping strategy.
///
/// # Example
///
/// ```rust
/// use exif_scrub::config::{StripConfig, StripMode};
///
/// let strip = StripConfig {
///     mode: StripMode::Reencode,
///     keep_icc: true,    // colour profile is not identifying, keep it
///     jpeg_quality: 95,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    /// Re-encode pixels (default) or strip containers losslessly.
    pub mode: StripMode,
    /// Preserve the embedded ICC colour profile.
    pub keep_icc: bool,
    /// JPEG quality used when re-encoding (1-100).
    pub jpeg_quality: u8,
}

/// Output behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, report what would be removed without writing any files.
    pub dry_run: bool,
    /// If `true`, replace the original file instead of writing a copy next to it.
    pub in_place: bool,
    /// If `true`, create a `.bak` backup before replacing an image in place.
    pub backup_originals: bool,
    /// Appended to the file stem of clean copies (`photo.jpg` → `photo_clean.jpg`).
    pub suffix: String,
    /// Optional directory for clean copies. Defaults to the source directory.
    pub output_dir: Option<String>,
}

/// Undo/redo settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo steps kept. `0` means unbounded.
    pub limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strip: StripConfig::default(),
            output: OutputConfig::default(),
            history: HistoryConfig::default(),
            jobs: 4,
        }
    }
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            mode: StripMode::Reencode,
            keep_icc: false,
            jpeg_quality: 92,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            in_place: false,
            backup_originals: true,
            suffix: "_clean".to_string(),
            output_dir: None,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Reject values that would make every run fail later on.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.strip.jpeg_quality) {
            anyhow::bail!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.strip.jpeg_quality
            );
        }
        if !self.output.in_place && self.output.suffix.is_empty() && self.output.output_dir.is_none() {
            anyhow::bail!("An empty suffix without output_dir would overwrite the originals; use in_place instead");
        }
        if self.jobs == 0 {
            anyhow::bail!("jobs must be at least 1");
        }
        Ok(())
    }
}
