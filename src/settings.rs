// Application settings - persisted as JSON in the user's config directory

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const APP_DIR: &str = "BoxyTube";
const SETTINGS_FILE: &str = "settings.json";

/// Default-quality choices offered to the user, highest first
pub const QUALITY_CHOICES: [u32; 8] = [2160, 1440, 1080, 720, 480, 360, 240, 144];

/// Named instances: (name, host, use_https)
pub const HOST_PRESETS: [(&str, &str, bool); 3] = [
    ("local", "192.168.1.3:3000", false),
    ("protokolla", "invidious.protokolla.fi", true),
    ("localhost", "127.0.0.1:3000", false),
];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings JSON invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// User-facing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AppSettings {
    /// Invidious host with optional port (e.g., "yewtu.be" or "192.168.1.3:3000")
    pub api_host: String,

    /// Use https when talking to the host
    pub use_https: bool,

    /// Preferred vertical resolution in pixels
    pub default_quality: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_host: "192.168.1.3:3000".to_string(),
            use_https: false,
            default_quality: 1080,
        }
    }
}

impl AppSettings {
    /// Base URL for API calls, e.g. "http://192.168.1.3:3000"
    pub fn api_base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{}://{}", scheme, self.api_host.trim_end_matches('/'))
    }

    /// Update one field from user input: `host`, `https` or `quality`
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "host" => {
                let host = value.trim().trim_end_matches('/');
                if host.is_empty() || host.contains("://") || host.contains(char::is_whitespace) {
                    return Err(invalid());
                }
                self.api_host = host.to_string();
            }
            "https" => {
                self.use_https = match value.trim().to_ascii_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => return Err(invalid()),
                };
            }
            "quality" => {
                let quality: u32 = value
                    .trim()
                    .trim_end_matches('p')
                    .parse()
                    .map_err(|_| invalid())?;
                if !QUALITY_CHOICES.contains(&quality) {
                    return Err(invalid());
                }
                self.default_quality = quality;
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }

        debug!(key, value, "Setting updated");
        Ok(())
    }

    /// Switch host and scheme to one of `HOST_PRESETS`
    pub fn apply_preset(&mut self, name: &str) -> Result<(), SettingsError> {
        let (_, host, https) = HOST_PRESETS
            .iter()
            .find(|(preset, _, _)| *preset == name)
            .ok_or_else(|| SettingsError::UnknownPreset(name.to_string()))?;

        self.api_host = host.to_string();
        self.use_https = *https;
        Ok(())
    }

    /// Default settings file location
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!("Cannot locate settings: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings from `path`. Missing or malformed files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        debug!("Loading settings from {}", path.display());

        if !path.exists() {
            info!("Settings file does not exist, using defaults");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(settings) => {
                debug!(api_host = %settings.api_host, "Settings loaded");
                settings
            }
            Err(e) => {
                warn!("Error loading settings from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn try_load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }
}

/// Network configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Proxy URL (e.g., "socks5h://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,

    /// Honor HTTP_PROXY/HTTPS_PROXY when no explicit proxy is set
    pub use_system_proxy: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Duration::from_secs(30),
            use_system_proxy: true,
        }
    }
}

impl NetworkConfig {
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.use_system_proxy = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
