//! Logging
//!
//! Suite progress is emitted as `tracing` events. [`init`] installs a
//! formatting subscriber for binaries; [`MessageCollector`] records events
//! in memory so that callers can inspect the progress lines directly.

use crate::error::SuiteError;
use parking_lot::Mutex;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};
use tracing_subscriber::{EnvFilter, Registry};

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "UPGRADE_SUITE_LOG";

/// Output format of [`init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info,upgrade_suite=debug`
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Default configuration with the filter taken from [`LOG_ENV`] if set
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(filter) = std::env::var(LOG_ENV) {
            config.filter = filter;
        }
        config
    }

    /// With filter directive
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// With output format
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Install the global formatting subscriber
///
/// # Errors
/// - `SuiteError::InvalidLogFilter` if the filter does not parse
/// - `SuiteError::LoggingInit` if a global subscriber is already set
pub fn init(config: &LogConfig) -> Result<(), SuiteError> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|source| SuiteError::InvalidLogFilter {
        filter: config.filter.clone(),
        source,
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| SuiteError::LoggingInit(e.to_string()))
}

/// An event recorded by [`MessageCollector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Event level
    pub level: Level,
    /// Event target (module path by default)
    pub target: String,
    /// Rendered message
    pub message: String,
    /// Remaining fields, rendered with `Debug`
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Value of a field, if recorded
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// In-memory event recorder
///
/// Clones share the same buffer, so one clone can be installed as a layer
/// while another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct MessageCollector {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl MessageCollector {
    /// Create an empty collector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher recording every event into this collector
    #[must_use]
    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(Registry::default().with(self.clone()))
    }

    /// All events recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Messages of events at least as severe as `level`
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.level <= level)
            .map(|event| event.message.clone())
            .collect()
    }

    /// Messages at INFO and above, which include every progress line
    #[must_use]
    pub fn info_messages(&self) -> Vec<String> {
        self.messages(Level::INFO)
    }

    /// Forget recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl<S: Subscriber> Layer<S> for MessageCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_records_message_and_fields() {
        let collector = MessageCollector::new();

        tracing::dispatcher::with_default(&collector.dispatch(), || {
            tracing::info!(phase = 1, operation = "Serving", "1.1) Installing");
            tracing::debug!("hidden from info");
        });

        let events = collector.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "1.1) Installing");
        assert_eq!(events[0].field("phase"), Some("1"));
        assert_eq!(events[0].field("operation"), Some("Serving"));
        assert_eq!(collector.info_messages(), vec!["1.1) Installing".to_string()]);
        assert_eq!(collector.messages(Level::DEBUG).len(), 2);

        collector.clear();
        assert!(collector.events().is_empty());
    }

    #[test]
    fn log_config_deserializes_with_defaults() {
        let config: LogConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = LogConfig::default().with_filter("upgrade_suite=notalevel");
        let err = init(&config).unwrap_err();
        assert!(matches!(err, SuiteError::InvalidLogFilter { .. }));
        assert!(err.is_user_error());
    }
}
