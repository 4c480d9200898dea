//! Error types for the upgrade suite
//!
//! Operation failures never surface here: they are reported through the
//! test handle. These errors cover the process around a suite run, such as
//! logging setup and settings files.

use std::path::PathBuf;

/// Errors raised outside of suite execution
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    /// Log filter directive could not be parsed
    #[error("invalid log filter {filter:?}: {source}")]
    InvalidLogFilter {
        /// The rejected directive
        filter: String,
        /// Parser error
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber was already installed
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Settings file could not be read
    #[error("failed to read settings from {}: {source}", .path.display())]
    SettingsRead {
        /// File that was read
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for [`Settings`](crate::settings::Settings)
    #[error("invalid settings in {}: {source}", .path.display())]
    SettingsParse {
        /// File that was parsed
        path: PathBuf,
        /// Decoder error
        #[source]
        source: toml::de::Error,
    },
}

impl SuiteError {
    /// Whether the error comes from a user-supplied file or directive
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidLogFilter { .. } | Self::SettingsParse { .. } | Self::SettingsRead { .. }
        )
    }
}
