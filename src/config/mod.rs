//! Configuration management for SmartMarks.
//!
//! Configuration is read from `~/.config/smartmarks/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod colors;
pub mod keybindings;

pub use colors::ColorConfig;
pub use keybindings::{KeybindingConfig, Keymap};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::app::{Result, SmartmarksError};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub colors: ColorConfig,
    pub keybindings: KeybindingConfig,
}

/// Where the hosted backend lives and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://<project>.supabase.co`
    pub url: String,
    /// Public (anon) API key of the project
    pub anon_key: String,
    pub table: String,
    /// OAuth provider used for sign-in
    pub provider: String,
    pub callback_port: u16,
    pub poll_interval_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            table: "bookmarks".to_string(),
            provider: "google".to_string(),
            callback_port: 54321,
            poll_interval_secs: 3,
        }
    }
}

impl BackendConfig {
    /// Project URL with a trailing slash, ready for `Url::join`.
    pub fn base_url(&self) -> Result<Url> {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            return Err(SmartmarksError::Config(
                "backend.url is not set in the config file".into(),
            ));
        }
        let with_slash = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        Ok(Url::parse(&with_slash)?)
    }

    /// Fail early when the settings needed to reach the backend are missing.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.anon_key.trim().is_empty() {
            return Err(SmartmarksError::Config(
                "backend.anon_key is not set in the config file".into(),
            ));
        }
        if self.table.trim().is_empty() {
            return Err(SmartmarksError::Config("backend.table must not be empty".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> std::result::Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/smartmarks/config.toml`
    pub fn default_config_path() -> std::result::Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("smartmarks").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> std::result::Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(path, Self::default_config_content()).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn default_config_content() -> &'static str {
        r##"# SmartMarks Configuration

[backend]
# Project URL and public anon key of the hosted backend.
url = ""
anon_key = ""

# Table holding the bookmarks (columns: id, url, title, user_id, created_at)
table = "bookmarks"

# OAuth provider for `smartmarks login`
provider = "google"

# Local port the browser is redirected to after sign-in.
# Add http://127.0.0.1:<port>/callback to the project's allowed redirect URLs.
callback_port = 54321

# How often the bookmark list checks for changes, in seconds
poll_interval_secs = 3

# Colors can be named (Blue, DarkGray, LightRed, ...) or hex ("#RRGGBB", "#RGB").
[colors]
brand = "Blue"
active_border = "Blue"
inactive_border = "DarkGray"
selection_bg = "Blue"
selection_fg = "White"
bookmark_title = "White"
bookmark_host = "Gray"
bookmark_date = "DarkGray"
placeholder = "DarkGray"
button = "Blue"
button_disabled = "DarkGray"
error = "LightRed"
status_fg = "White"
status_bg = "DarkGray"

# Keys: single characters, special keys (Enter, Tab, BackTab, Delete, Up,
# Down, PageUp, PageDown, Esc, Space, F1-F12), optionally with modifiers
# ("Ctrl+c", "Shift+Tab", "Alt+Enter").
# While a form field has focus, typed characters go to the field.
[keybindings]
quit = ["q", "Ctrl+c"]
move_up = ["k", "Up"]
move_down = ["j", "Down"]
next_page = ["n", "PageDown"]
prev_page = ["p", "PageUp"]
next_pane = ["Tab"]
prev_pane = ["BackTab", "Shift+Tab"]
select = ["Enter"]
open_in_browser = ["o"]
delete_bookmark = ["d", "Delete"]
sign_in = ["l"]
sign_out = ["L"]
reload = ["R"]
"##
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
