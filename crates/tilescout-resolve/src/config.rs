use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::geocode::nominatim::NOMINATIM_SEARCH_URL;

/// Public bucket holding the `<id>_native.jpeg` chip thumbnails.
pub const DEFAULT_THUMBNAIL_BASE: &str =
    "https://lgnd-fullstack-takehome-thumbnails.s3.us-east-2.amazonaws.com";

/// Configuration for tilescout.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (SCOUT_* prefix)
/// 3. Config file (~/.config/tilescout/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite embedding store.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: SCOUT_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/tilescout/embeddings.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Base URL that thumbnail names are appended to.
    #[serde(default = "default_thumbnail_base")]
    pub thumbnail_base: String,

    /// Live geocoder search endpoint.
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// Live geocoder request timeout, in seconds.
    #[serde(default = "default_geocoder_timeout_secs")]
    pub geocoder_timeout_secs: u64,

    /// Run the warmup phrases before the server starts accepting requests.
    #[serde(default = "default_warmup")]
    pub warmup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            bind_address: default_bind_address(),
            thumbnail_base: default_thumbnail_base(),
            geocoder_url: default_geocoder_url(),
            geocoder_timeout_secs: default_geocoder_timeout_secs(),
            warmup: default_warmup(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/tilescout/config.toml
    /// Reads environment variables with SCOUT_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("scout");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// Parse a TOML document, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for `Config`.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Render the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoder_timeout_secs)
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/tilescout/embeddings.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilescout")
        .join("embeddings.db")
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_thumbnail_base() -> String {
    DEFAULT_THUMBNAIL_BASE.to_string()
}

fn default_geocoder_url() -> String {
    NOMINATIM_SEARCH_URL.to_string()
}

const fn default_geocoder_timeout_secs() -> u64 {
    10
}

const fn default_warmup() -> bool {
    true
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/tilescout/config.toml
/// - macOS: ~/Library/Application Support/tilescout/config.toml
/// - Windows: %APPDATA%\tilescout\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilescout")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# tilescout Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (SCOUT_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite embedding store
#
# Populate it with: tilescout import chips.ndjson
#
# Can also be set via:
# - CLI: tilescout --db /custom/path.db serve
# - Environment: SCOUT_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/embeddings.db"

# Address for `tilescout serve`
bind_address = "127.0.0.1:8000"

# Thumbnails are served from <thumbnail_base>/<chips_id>_native.jpeg
thumbnail_base = "https://lgnd-fullstack-takehome-thumbnails.s3.us-east-2.amazonaws.com"

# Live geocoder, used only when a query matches no built-in phrase
geocoder_url = "https://nominatim.openstreetmap.org/search"
geocoder_timeout_secs = 10

# Resolve a few common phrases at startup so first requests are fast
warmup = true
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
