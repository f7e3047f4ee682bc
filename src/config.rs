use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for microreel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Encoder settings
    pub encode: EncodeConfig,

    /// Content ordering settings
    pub ordering: OrderingConfig,

    /// Output file settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            encode: EncodeConfig::default(),
            ordering: OrderingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.encode.validate()?;
        self.ordering.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

/// Video encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeConfig {
    /// Output frame width in pixels
    pub width: u32,

    /// Output frame height in pixels
    pub height: u32,

    /// Target bit rate in bits per second
    pub bit_rate: u32,

    /// Target frame rate in frames per second
    pub frame_rate: u32,

    /// Seconds between key frames
    pub keyframe_interval_s: u32,

    /// Total reel duration in milliseconds
    pub total_duration_ms: u64,

    /// Per-call poll interval when draining encoder output, in microseconds
    pub drain_timeout_us: u64,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            bit_rate: 20_000_000,
            frame_rate: 50,
            keyframe_interval_s: 5,
            total_duration_ms: 30_000,
            drain_timeout_us: 10_000,
        }
    }
}

impl EncodeConfig {
    /// Total frame budget for a session at this duration and frame rate.
    pub fn total_frames(&self) -> u64 {
        self.total_duration_ms * self.frame_rate as u64 / 1000
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "encode.dimensions".to_string(),
                value: format!("{}x{}", self.width, self.height),
            }
            .into());
        }

        if self.frame_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "encode.frame_rate".to_string(),
                value: self.frame_rate.to_string(),
            }
            .into());
        }

        if self.total_duration_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "encode.total_duration_ms".to_string(),
                value: self.total_duration_ms.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Content ordering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingConfig {
    /// How many distinct previously-used items a new pick must avoid
    pub lookback: usize,

    /// Optional RNG seed for reproducible orderings
    pub seed: Option<u64>,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            lookback: 3,
            seed: None,
        }
    }
}

impl OrderingConfig {
    /// Minimum pool size below which repetition constraints are relaxed.
    pub fn spacing_window(&self) -> usize {
        self.lookback * 2 + 1
    }

    fn validate(&self) -> Result<()> {
        if self.lookback == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ordering.lookback".to_string(),
                value: self.lookback.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Output file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for finished reels
    pub directory: PathBuf,

    /// File name prefix for finished reels
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("reels"),
            file_prefix: "MicroReel".to_string(),
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.file_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output.file_prefix".to_string(),
                value: "<empty>".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
