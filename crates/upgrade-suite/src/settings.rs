//! Process-level settings for the `upgrade-suite` binary
//!
//! ```toml
//! wait_time_ms = 50
//!
//! [log]
//! filter = "info,upgrade_suite=debug"
//! format = "json"
//! ```

use crate::context::DEFAULT_WAIT_TIME;
use crate::error::SuiteError;
use crate::logging::LogConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Settings loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Logging configuration
    pub log: LogConfig,
    /// Stop-channel polling interval of background verifications
    pub wait_time_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log: LogConfig::from_env(),
            wait_time_ms: u64::try_from(DEFAULT_WAIT_TIME.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Errors
    /// - `SuiteError::SettingsRead` if the file cannot be read
    /// - `SuiteError::SettingsParse` if it is not valid settings TOML
    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SuiteError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| SuiteError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Polling interval as a duration
    #[inline]
    #[must_use]
    pub fn wait_time(&self) -> Duration {
        Duration::from_millis(self.wait_time_ms)
    }
}
