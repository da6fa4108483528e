//! Tabular Ingest - schema-inferring CSV loader
//!
//! Loads directories of CSV files of unknown, varying shape into a relational
//! destination:
//! - Name sanitization for tables and columns
//! - Column type inference and two-pass date detection
//! - Create-once table reconciliation against a per-run catalog snapshot
//! - Chunked, transactional writes with a post-write row count
//! - Per-file failure isolation and a run summary

pub mod config;
pub mod database;
pub mod import;
pub mod inference;
pub mod logging;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use config::IngestConfig;
pub use database::{DatabaseError, Destination};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDBBackend;
#[cfg(feature = "postgres-backend")]
pub use database::PostgresBackend;
pub use import::{CsvImporter, ImportError};
pub use inference::{CollisionPolicy, sanitize_name};
pub use pipeline::{FileOutcome, IngestError, Pipeline, PipelineOptions, RunSummary};

// Re-export models
pub use models::enums::*;
pub use models::{Column, InferredSchema, RawTable, Value};
