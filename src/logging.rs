//! Tracing subscriber setup for applications embedding acton-model.
//!
//! The library itself only emits `tracing` events (retries, degradations,
//! endpoint swaps). Binaries and tests call [`init_logging`] once to route
//! those events to stderr or to a daily rolling file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured level with a full
/// `tracing_subscriber` filter directive (e.g. `acton_model=debug`).
pub const LOG_ENV_VAR: &str = "ACTON_MODEL_LOG";

/// Where log output is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Human-readable lines on stderr.
    #[default]
    Stderr,
    /// Daily rolling file `{app_name}.log` in `log_dir`, or in the XDG
    /// data dir under `acton-model/logs` when unset.
    File,
}

/// Logging configuration.
///
/// # Example
///
/// ```rust
/// use acton_model::logging::{LogLevel, LoggingConfig};
///
/// let config = LoggingConfig::new()
///     .with_file("/tmp/acton-model-logs")
///     .with_level(LogLevel::Debug);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled.
    pub enabled: bool,
    /// Output target.
    pub target: LogTarget,
    /// Used for the log file name.
    pub app_name: String,
    /// Custom log directory for [`LogTarget::File`].
    pub log_dir: Option<PathBuf>,
    /// Level used when [`LOG_ENV_VAR`] is unset.
    pub level: LogLevel,
}

impl LoggingConfig {
    /// Creates a stderr configuration at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disabled logging configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Switches to file output in `dir`.
    #[must_use]
    pub fn with_file(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target = LogTarget::File;
        self.log_dir = Some(dir.into());
        self
    }

    /// Sets the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the application name for log file naming.
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Sets the log level filter.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: LogTarget::default(),
            app_name: "acton-model".to_string(),
            log_dir: None,
            level: LogLevel::default(),
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - includes every SSE frame.
    Trace,
    /// Debug level.
    Debug,
    /// Info level - default.
    #[default]
    Info,
    /// Warn level - retries and degradations only.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the directive string understood by `EnvFilter`.
    #[must_use]
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Builds an `EnvFilter` for this level, preferring [`LOG_ENV_VAR`].
    #[must_use]
    pub fn to_env_filter(self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(self.as_directive()))
    }
}

/// Guard that keeps the file writer alive.
///
/// When dropped, flushes pending logs and stops file logging.
pub struct LoggingGuard {
    file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file", &self.file_guard.is_some())
            .finish()
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingError {
    /// The specific error that occurred.
    pub kind: LoggingErrorKind,
}

/// Specific logging error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingErrorKind {
    /// Failed to determine XDG data directory.
    NoDataDir,
    /// Failed to create log directory.
    CreateDirFailed {
        /// The path that could not be created.
        path: PathBuf,
        /// The reason for failure.
        reason: String,
    },
    /// Subscriber initialization failed.
    SubscriberInitFailed {
        /// The reason for failure.
        reason: String,
    },
}

impl LoggingError {
    /// Creates a new LoggingError with the given kind.
    #[must_use]
    pub fn new(kind: LoggingErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an error for missing XDG data directory.
    #[must_use]
    pub fn no_data_dir() -> Self {
        Self::new(LoggingErrorKind::NoDataDir)
    }

    /// Creates an error for failed directory creation.
    #[must_use]
    pub fn create_dir_failed(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::CreateDirFailed {
            path,
            reason: reason.into(),
        })
    }

    /// Creates an error for subscriber initialization failure.
    #[must_use]
    pub fn subscriber_init_failed(reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::SubscriberInitFailed {
            reason: reason.into(),
        })
    }

    /// Returns true if a global subscriber was already installed.
    #[must_use]
    pub fn is_already_initialized(&self) -> bool {
        matches!(self.kind, LoggingErrorKind::SubscriberInitFailed { .. })
    }
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoggingErrorKind::NoDataDir => {
                write!(
                    f,
                    "could not determine XDG data directory; set XDG_DATA_HOME or use a custom log_dir"
                )
            }
            LoggingErrorKind::CreateDirFailed { path, reason } => {
                write!(
                    f,
                    "failed to create log directory '{}': {}; check permissions",
                    path.display(),
                    reason
                )
            }
            LoggingErrorKind::SubscriberInitFailed { reason } => {
                write!(
                    f,
                    "failed to initialize tracing subscriber: {}; a subscriber may already be set",
                    reason
                )
            }
        }
    }
}

impl std::error::Error for LoggingError {}

/// Returns the directory file logs go to for `config`.
///
/// # Errors
///
/// Returns an error if no custom directory is set and the XDG data
/// directory cannot be determined.
pub fn log_dir(config: &LoggingConfig) -> Result<PathBuf, LoggingError> {
    if let Some(ref custom_dir) = config.log_dir {
        return Ok(custom_dir.clone());
    }

    dirs::data_local_dir()
        .map(|dir| dir.join("acton-model").join("logs"))
        .ok_or_else(LoggingError::no_data_dir)
}

/// Installs the global tracing subscriber described by `config`.
///
/// Returns `Ok(None)` when logging is disabled. Hold the returned guard for
/// as long as logs should be written.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<LoggingGuard>, LoggingError> {
    if !config.enabled {
        return Ok(None);
    }

    let filter = config.level.to_env_filter();

    let (result, guard) = match config.target {
        LogTarget::Stderr => {
            let result = tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .try_init();
            (result, None)
        }
        LogTarget::File => {
            let dir = log_dir(config)?;
            std::fs::create_dir_all(&dir)
                .map_err(|e| LoggingError::create_dir_failed(dir.clone(), e.to_string()))?;

            let file_appender =
                tracing_appender::rolling::daily(&dir, format!("{}.log", config.app_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let result = tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(false),
                )
                .try_init();
            (result, Some(guard))
        }
    };

    result
        .map(|()| Some(LoggingGuard { file_guard: guard }))
        .map_err(|e| LoggingError::subscriber_init_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_logs_to_stderr_at_info() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.target, LogTarget::Stderr);
        assert_eq!(config.app_name, "acton-model");
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn with_file_switches_target() {
        let config = LoggingConfig::new()
            .with_file("/tmp/logs")
            .with_app_name("chat")
            .with_level(LogLevel::Debug);

        assert_eq!(config.target, LogTarget::File);
        assert_eq!(log_dir(&config).unwrap(), PathBuf::from("/tmp/logs"));
        assert_eq!(config.app_name, "chat");
    }

    #[test]
    fn default_log_dir_is_under_app_name() {
        if let Ok(dir) = log_dir(&LoggingConfig::default()) {
            assert!(dir.ends_with("acton-model/logs"));
        }
    }

    #[test]
    fn log_level_directives() {
        assert_eq!(LogLevel::Trace.as_directive(), "trace");
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
    }

    #[test]
    fn disabled_returns_no_guard() {
        let result = init_logging(&LoggingConfig::disabled()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn create_dir_failed_display_names_path() {
        let error =
            LoggingError::create_dir_failed(PathBuf::from("/nonexistent/path"), "permission denied");
        let message = error.to_string();
        assert!(message.contains("/nonexistent/path"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn config_deserializes_from_toml() {
        let config: LoggingConfig = toml::from_str(
            r#"
enabled = true
target = "file"
app_name = "chat"
log_dir = "/var/log/chat"
level = "warn"
"#,
        )
        .unwrap();

        assert_eq!(config.target, LogTarget::File);
        assert_eq!(config.level, LogLevel::Warn);
    }
}
