// Configuration management
//
// Handles viewer configuration and settings persistence. The file is TOML;
// every section falls back to its defaults when absent.

use crate::engine::{
    GeometryError, TimingGeometry, TimingSettings, DEFAULT_REDRAW_EVERY, DEFAULT_SOURCE_TAG,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default configuration file path
pub const CONFIG_FILE: &str = "vga_view.toml";

/// Errors that can occur while loading or saving the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("cannot access {path}: {source}")]
    Io {
        /// File that was accessed
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The file is not valid TOML for this configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The timing section describes an impossible raster
    #[error("invalid timing: {0}")]
    Geometry(#[from] GeometryError),
}

/// Viewer configuration
///
/// Stores all user-configurable settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Relay connection settings
    pub connection: ConnectionConfig,

    /// Raster timing of the simulated display
    pub timing: TimingSettings,

    /// Window and redraw settings
    pub display: DisplayConfig,

    /// Screenshot settings
    pub screenshot: ScreenshotConfig,

    /// Gamepad reporter settings
    pub gamepad: GamepadConfig,
}

/// Relay connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Relay host name or address
    pub address: String,

    /// Relay TCP port
    pub port: u16,

    /// Prefix of the records the display reconstructs from
    pub source_tag: String,

    /// Byte chunks buffered between the reader thread and the engine
    pub channel_capacity: usize,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Window scale (1-8)
    pub scale: u32,

    /// Events processed between redraws
    pub redraw_every: u32,

    /// Target FPS
    pub fps: u32,

    /// Enable VSync
    pub vsync: bool,
}

/// Screenshot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Screenshot directory
    pub screenshot_directory: PathBuf,

    /// Include timestamp in filename
    pub include_timestamp: bool,
}

/// Gamepad reporter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadConfig {
    /// Send button state to the relay
    pub enabled: bool,

    /// Prefix of outgoing gamepad records
    pub source_tag: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 1080,
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            channel_capacity: 64,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            scale: 1,
            redraw_every: DEFAULT_REDRAW_EVERY,
            fps: 60,
            vsync: true,
        }
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            screenshot_directory: PathBuf::from("screenshots"),
            include_timestamp: true,
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_tag: crate::input::GAMEPAD_SOURCE_TAG.to_string(),
        }
    }
}

impl ConnectionConfig {
    /// `host:port` string for connecting
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl ViewerConfig {
    /// Load configuration from `path` or fall back to defaults
    ///
    /// A missing file is replaced by the defaults, which are written back
    /// on a best-effort basis. A file that exists but cannot be parsed is an
    /// error, so a typo never silently resets the timing.
    ///
    /// # Arguments
    /// * `path` - Configuration file
    ///
    /// # Returns
    /// The loaded or default configuration
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                // Try to save the default config, but don't fail if we can't
                if let Err(err) = config.save(path) {
                    warn!(path = %path.display(), error = %err, "could not write default configuration");
                }
                Ok(config)
            }
            Err(err) => Err(err),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validated timing geometry
    ///
    /// # Errors
    /// Returns [`ConfigError::Geometry`] if the timing section is impossible
    pub fn geometry(&self) -> Result<TimingGeometry, ConfigError> {
        Ok(TimingGeometry::new(self.timing)?)
    }
}
