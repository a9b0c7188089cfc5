use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::browser::chromium::{
    DEFAULT_PAGE_TIMEOUT_SECS, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
};
use crate::browser::SessionConfig;
use crate::collector::CollectorSettings;
use crate::constants::{
    DEFAULT_DETAIL_PAUSE_MS, DEFAULT_FEED_BASE_URL, DEFAULT_SCROLL_BACK_OFFSET_PX,
    DEFAULT_SCROLL_PAUSE_MS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("failed to read driver table {path}: {source}")]
    ReadDrivers {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse driver table {path}: {source}")]
    ParseDrivers {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("driver '{0}' is not listed in the driver table")]
    UnknownDriver(String),
    #[error("driver '{driver}' has no executable for {platform}")]
    MissingPlatform { driver: String, platform: Platform },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Site
    pub feed_base_url: String,

    // Browser
    pub driver: String,
    pub browser_path: Option<PathBuf>,
    pub drivers_file: PathBuf,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub page_timeout: Duration,

    // Pacing
    pub scroll_pause: Duration,
    pub detail_pause: Duration,
    pub scroll_back_offset: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Site
            feed_base_url: env_or_default("FEED_BASE_URL", DEFAULT_FEED_BASE_URL),

            // Browser
            driver: env_or_default("BROWSER_DRIVER", "chromium"),
            browser_path: optional_env("BROWSER_PATH").map(PathBuf::from),
            drivers_file: PathBuf::from(env_or_default("DRIVERS_FILE", "config/drivers.toml")),
            headless: parse_env_bool("HEADLESS", true)?,
            viewport_width: parse_env_u32("VIEWPORT_WIDTH", DEFAULT_VIEWPORT_WIDTH)?,
            viewport_height: parse_env_u32("VIEWPORT_HEIGHT", DEFAULT_VIEWPORT_HEIGHT)?,
            page_timeout: Duration::from_secs(parse_env_u64(
                "PAGE_TIMEOUT_SECS",
                DEFAULT_PAGE_TIMEOUT_SECS,
            )?),

            // Pacing
            scroll_pause: Duration::from_millis(parse_env_u64(
                "SCROLL_PAUSE_MS",
                DEFAULT_SCROLL_PAUSE_MS,
            )?),
            detail_pause: Duration::from_millis(parse_env_u64(
                "DETAIL_PAUSE_MS",
                DEFAULT_DETAIL_PAUSE_MS,
            )?),
            scroll_back_offset: parse_env_u32(
                "SCROLL_BACK_OFFSET_PX",
                DEFAULT_SCROLL_BACK_OFFSET_PX,
            )?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.feed_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "FEED_BASE_URL".to_string(),
                message: format!("'{}' is not an absolute URL", self.feed_base_url),
            });
        }
        if self.driver.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "BROWSER_DRIVER".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::InvalidValue {
                name: "VIEWPORT_WIDTH/VIEWPORT_HEIGHT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.page_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "PAGE_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Pick the browser executable.
    ///
    /// An explicit `BROWSER_PATH` wins. Otherwise the configured driver is
    /// looked up in the driver table for the current platform. With no table
    /// on disk the browser is auto-detected (`Ok(None)`).
    ///
    /// # Errors
    ///
    /// Returns an error if the table exists but cannot be read, or does not
    /// list the driver for this platform.
    pub fn resolve_executable(&self) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(ref path) = self.browser_path {
            return Ok(Some(path.clone()));
        }
        if !self.drivers_file.exists() {
            return Ok(None);
        }
        let table = DriverTable::load(&self.drivers_file)?;
        table
            .executable(&self.driver, Platform::current())
            .map(Some)
    }

    /// Launch settings for the browser session.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable cannot be resolved.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        Ok(SessionConfig {
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            page_timeout: self.page_timeout,
            executable: self.resolve_executable()?,
            headless: self.headless,
        })
    }

    #[must_use]
    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            feed_base_url: self.feed_base_url.clone(),
            scroll_pause: self.scroll_pause,
            detail_pause: self.detail_pause,
            scroll_back_offset: self.scroll_back_offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Mac
        } else {
            Self::Linux
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Windows => "windows",
        })
    }
}

/// Logical driver names mapped to per-platform executables.
///
/// ```toml
/// [drivers.chromium]
/// linux = "/usr/bin/chromium"
/// mac = "/Applications/Chromium.app/Contents/MacOS/Chromium"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverTable {
    #[serde(default)]
    drivers: HashMap<String, PlatformPaths>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl DriverTable {
    /// Read a driver table from disk. Relative paths in the table resolve
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadDrivers {
            path: path.to_path_buf(),
            source,
        })?;
        let mut table: Self = toml::from_str(&raw).map_err(|source| ConfigError::ParseDrivers {
            path: path.to_path_buf(),
            source,
        })?;
        table.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(table)
    }

    /// Executable for `driver` on `platform`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver or its platform entry is missing.
    pub fn executable(&self, driver: &str, platform: Platform) -> Result<PathBuf, ConfigError> {
        let paths = self
            .drivers
            .get(driver)
            .ok_or_else(|| ConfigError::UnknownDriver(driver.to_string()))?;
        let path = paths.get(platform).ok_or_else(|| ConfigError::MissingPlatform {
            driver: driver.to_string(),
            platform,
        })?;
        Ok(if path.is_absolute() {
            path.clone()
        } else {
            self.base_dir.join(path)
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlatformPaths {
    linux: Option<PathBuf>,
    mac: Option<PathBuf>,
    windows: Option<PathBuf>,
}

impl PlatformPaths {
    fn get(&self, platform: Platform) -> Option<&PathBuf> {
        match platform {
            Platform::Linux => self.linux.as_ref(),
            Platform::Mac => self.mac.as_ref(),
            Platform::Windows => self.windows.as_ref(),
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
