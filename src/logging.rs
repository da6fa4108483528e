//! Log output setup
//!
//! Library code only emits `tracing` events. Binaries call [`init`] once to
//! render them to stderr and, optionally, to an append-only log file.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingSection;

/// Error raised while installing the log subscriber
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Open `path` for appending, creating its parent directory
pub fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    let to_err = |source| LoggingError::LogFile {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(to_err)?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_err)
}

/// Filter from `RUST_LOG`, else `level`, else `info`
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber: console on stderr plus the configured file
pub fn init(logging: &LoggingSection) -> Result<(), LoggingError> {
    let file_layer = if logging.file.is_empty() {
        None
    } else {
        let file = open_log_file(Path::new(&logging.file))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter(&logging.level))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("ingest.log");

        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "first").unwrap();
        drop(file);

        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "second").unwrap();
        drop(file);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_env_filter_accepts_level() {
        let filter = env_filter("debug");
        assert!(!filter.to_string().is_empty());
    }
}
