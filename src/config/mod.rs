//! Configuration management.
//!
//! Configuration is read from `~/.config/tributary/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::fetch::FetchConfig;
use crate::session::SessionConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub session: SessionConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Where cached content lives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the SQLite cache database. Defaults to the platform data
    /// directory when unset.
    pub path: Option<PathBuf>,
}

impl CoreConfig {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            // Create default config with comments
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: CoreConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/tributary/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("tributary").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let default_config = Self::default_config_content();

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(default_config.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Tributary Configuration
#
# Sources are extracted with either the structured engine (RSS/Atom) or
# the generic engine (CSS rules over HTML pages); this file configures the
# shared infrastructure underneath both. Every key is optional and falls
# back to the default shown.

[session]
# Number of reusable browser tabs in the pool
max_tabs = 5

# Navigations a tab serves before it is reset
max_navigations_per_tab = 50

# Run the browser in headless mode (no visible window)
headless = true

# User agent applied to every pooled tab
# user_agent = "Mozilla/5.0 (...)"

# Navigation timeout in milliseconds
navigation_timeout_ms = 10000

# How long to wait for a requested selector to appear (milliseconds)
selector_timeout_ms = 5000

# Interval between selector polls (milliseconds)
poll_interval_ms = 200

# Wait after navigation when no selector is requested (milliseconds)
render_settle_ms = 1000

# Scroll behavior before capture: "none", "bottom" or "full"
scroll_mode = "bottom"

[fetch]
# HTTP request timeout in seconds
timeout_secs = 10

# User agent for plain HTTP fetches
user_agent = "tributary/0.1.0"

# Charset assumed when a response does not declare one
fallback_charset = "utf-8"

[cache]
# Path to the SQLite content cache. Defaults to the platform data
# directory, e.g. ~/.local/share/tributary/cache.db
# path = "/path/to/cache.db"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
