//! Import functionality
//!
//! Readers that turn delimited source files into [`crate::models::RawTable`]s.
//! Only CSV is supported today.

pub mod csv;

/// Error during import
#[derive(Debug, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum ImportError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Missing header row: {0}")]
    EmptyHeader(String),
}

// Re-export for convenience
pub use self::csv::CsvImporter;
