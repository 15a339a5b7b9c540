use crate::errors::util::to_bench_error;
use crate::errors::{BenchError, BenchResult};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Layer};

/// Log levels for the evaluation harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Only critical errors
    Error = 0,
    /// Important warnings
    Warn = 1,
    /// Normal informational messages
    Info = 2,
    /// Debug information, including provider request traces
    Debug = 3,
    /// Verbose tracing information
    Trace = 4,
}

impl LogLevel {
    /// Map a `-v` count onto a level, starting from `Info`
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Filter directive for this level. HTTP client internals stay at warn.
    pub fn directive(&self) -> String {
        format!("{},hyper=warn,hyper_util=warn,reqwest=warn,h2=warn", self.as_str())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Warn => write!(f, "WARN "),
            LogLevel::Info => write!(f, "INFO "),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Trace => write!(f, "TRACE"),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Console output goes to stderr at `console_level` unless `RUST_LOG` is set.
/// When `log_file` is given, a second non-blocking layer appends to it at
/// `file_level`. The returned guard must be held until exit so buffered file
/// output gets flushed.
pub fn configure_logger(
    console_level: LogLevel,
    file_level: LogLevel,
    log_file: Option<PathBuf>,
) -> BenchResult<Option<WorkerGuard>> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.directive()));
    let console_layer = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| {
                    BenchError::ConfigError(format!("Invalid log file path: {}", path.display()))
                })?
                .to_os_string();
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            fs::create_dir_all(&dir)?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(file_level.directive()));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| to_bench_error(e, "Failed to initialize logging"))?;

    tracing::debug!(
        "Logging initialized at level {} (console), {} (file)",
        console_level,
        file_level
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_verbosity() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(5), LogLevel::Trace);
    }

    #[test]
    fn test_directive_keeps_http_quiet() {
        let directive = LogLevel::Debug.directive();
        assert!(directive.starts_with("debug,"));
        assert!(directive.contains("reqwest=warn"));
        assert!(EnvFilter::try_new(directive).is_ok());
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
        assert_eq!(LogLevel::Warn.to_string(), "WARN ");
    }
}
