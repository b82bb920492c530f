//! Settings file management

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ClientError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Also write rolling log files into the layout's logs directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Status poller configuration
    #[serde(default)]
    pub poller: PollerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            backend: BackendSettings::default(),
            poller: PollerSettings::default(),
        }
    }
}

impl Settings {
    /// Read the settings file, falling back to defaults when it is absent
    pub async fn load(file: &File) -> Result<Self, ClientError> {
        match file.read_json_opt().await? {
            Some(settings) => Ok(settings),
            None => {
                debug!("No settings file at {}, using defaults", file.path().display());
                Ok(Self::default())
            }
        }
    }
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Task status poller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Polling interval in seconds
    #[serde(default = "default_polling_interval")]
    pub interval_secs: u64,

    /// Delay before the first poll in seconds
    #[serde(default)]
    pub initial_delay_secs: u64,
}

fn default_polling_interval() -> u64 {
    10
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_polling_interval(),
            initial_delay_secs: 0,
        }
    }
}
