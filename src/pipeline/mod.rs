//! Pipeline orchestration
//!
//! Drives one pass per input file:
//!
//! ```text
//! Pending → Reading → SchemaResolved → Writing → Verified
//!              │             │             │
//!              └─────────────┴─────────────┴──→ Failed
//! ```
//!
//! Each file is its own unit of work. A failing file is logged and reported
//! as [`FileOutcome::Failed`]; the run always continues with the next file.
//! Only problems reaching the destination at startup are fatal.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tabular_ingest::config::IngestConfig;
//! use tabular_ingest::pipeline::{Pipeline, discover_csv_files};
//!
//! let config = IngestConfig::load("tabular-ingest.toml".as_ref())?;
//! let mut pipeline = Pipeline::connect(&config, ".".as_ref()).await?;
//! let files = discover_csv_files(&config.source.directory, &config.source.pattern)?;
//! let summary = pipeline.run(&files).await;
//! println!("Loaded {} files", summary.files_processed);
//! ```

mod discover;
mod error;
mod stats;

pub use discover::{SourceFile, discover_csv_files};
pub use error::{ErrorKind, IngestError};
pub use stats::{FileFailure, FileOutcome, FileState, LoadStats, RunSummary};

use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{BackendType, DerivedTable, IngestConfig};
use crate::database::{BatchLoader, DERIVED_CHUNK_SIZE, Destination, RunContext};
use crate::import::CsvImporter;
use crate::inference::{
    CollisionPolicy, infer_schema, normalize_table_dates, sanitize_headers, sanitize_name,
};
use crate::models::{RawTable, WriteMode};

/// Load settings for a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub mode: WriteMode,
    pub collision: CollisionPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: crate::database::DEFAULT_CHUNK_SIZE,
            mode: WriteMode::Append,
            collision: CollisionPolicy::Reject,
        }
    }
}

impl From<&IngestConfig> for PipelineOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            chunk_size: config.load.chunk_size,
            mode: config.load.mode,
            collision: config.load.collision,
        }
    }
}

/// Open the destination named by the configuration
///
/// Relative DuckDB paths are resolved against `base_dir`.
pub async fn open_destination(
    config: &IngestConfig,
    base_dir: &Path,
) -> Result<Box<dyn Destination>, IngestError> {
    match config.destination.backend {
        BackendType::DuckDB => open_duckdb(config, base_dir),
        BackendType::Postgres => open_postgres(config),
    }
}

#[cfg(feature = "duckdb-backend")]
fn open_duckdb(config: &IngestConfig, base_dir: &Path) -> Result<Box<dyn Destination>, IngestError> {
    use crate::database::DuckDBBackend;

    let backend = if config.is_in_memory() {
        DuckDBBackend::in_memory()?
    } else {
        DuckDBBackend::new(config.duckdb_path(base_dir))?
    };
    Ok(Box::new(backend))
}

#[cfg(not(feature = "duckdb-backend"))]
fn open_duckdb(_config: &IngestConfig, _base_dir: &Path) -> Result<Box<dyn Destination>, IngestError> {
    Err(IngestError::FatalConfig(
        "DuckDB support not compiled in; enable the duckdb-backend feature".to_string(),
    ))
}

#[cfg(feature = "postgres-backend")]
fn open_postgres(config: &IngestConfig) -> Result<Box<dyn Destination>, IngestError> {
    use crate::database::PostgresBackend;

    let pg = &config.destination.postgres;
    let backend = PostgresBackend::new(&pg.connection_string(), pg.pool_size)?;
    info!(destination = %backend.connection_string_masked(), "using PostgreSQL");
    Ok(Box::new(backend))
}

#[cfg(not(feature = "postgres-backend"))]
fn open_postgres(_config: &IngestConfig) -> Result<Box<dyn Destination>, IngestError> {
    Err(IngestError::FatalConfig(
        "PostgreSQL support not compiled in; enable the postgres-backend feature".to_string(),
    ))
}

/// Drives files through read, inference, reconciliation and load
pub struct Pipeline {
    run_id: Uuid,
    destination: Box<dyn Destination>,
    context: RunContext,
    importer: CsvImporter,
    loader: BatchLoader,
    collision: CollisionPolicy,
}

impl Pipeline {
    /// Start a run against `destination`
    ///
    /// Checks the destination is reachable and takes the catalog snapshot
    /// used for the whole run. Failures here are fatal.
    pub async fn new(
        destination: Box<dyn Destination>,
        options: PipelineOptions,
    ) -> Result<Self, IngestError> {
        let loader = BatchLoader::new(options.chunk_size, options.mode)?;

        if !destination.health_check().await? {
            return Err(IngestError::FatalConfig(format!(
                "{} destination failed its health check",
                destination.backend_type()
            )));
        }

        let existing = destination.table_names().await?;
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            backend = destination.backend_type(),
            existing_tables = existing.len(),
            "connected to destination"
        );

        Ok(Self {
            run_id,
            destination,
            context: RunContext::from_catalog(existing),
            importer: CsvImporter::new(),
            loader,
            collision: options.collision,
        })
    }

    /// Open the configured destination and start a run
    pub async fn connect(config: &IngestConfig, base_dir: &Path) -> Result<Self, IngestError> {
        config.validate()?;
        let destination = open_destination(config, base_dir).await?;
        Self::new(destination, PipelineOptions::from(config)).await
    }

    /// Use a differently configured CSV reader
    pub fn with_importer(mut self, importer: CsvImporter) -> Self {
        self.importer = importer;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn destination(&self) -> &dyn Destination {
        self.destination.as_ref()
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Process every file in order and aggregate the outcomes
    pub async fn run(&mut self, files: &[SourceFile]) -> RunSummary {
        self.run_all(files, &[]).await
    }

    /// Process every file, then every derived query, and log one summary
    /// covering both
    pub async fn run_all(&mut self, files: &[SourceFile], derived: &[DerivedTable]) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::new(self.run_id);
        info!(
            run_id = %self.run_id,
            files = files.len(),
            derived = derived.len(),
            "starting ingest run"
        );

        for file in files {
            let outcome = self.ingest_file(file).await;
            summary.record(&outcome);
        }
        for table in derived {
            let outcome = self.run_derived(table).await;
            summary.record(&outcome);
        }

        summary.duration = start.elapsed();
        summary.log();
        summary
    }

    /// Read one CSV file and load it into the table named after its stem
    pub async fn ingest_file(&mut self, file: &SourceFile) -> FileOutcome {
        let start = Instant::now();
        let source = file.path.display().to_string();
        info!(file = %source, table = %file.table, state = %FileState::Pending, "processing file");

        debug!(file = %source, state = %FileState::Reading);
        let raw = match self.importer.import_path(&file.path) {
            Ok(raw) => raw,
            Err(e) => {
                return self.fail(
                    start,
                    source.clone(),
                    None,
                    FileState::Reading,
                    IngestError::SourceRead {
                        path: source,
                        source: e,
                    },
                );
            }
        };

        match self.ingest_table(raw, &file.table, self.loader).await {
            Ok(mut stats) => {
                stats.file = Some(file.path.clone());
                stats.duration = start.elapsed();
                info!(
                    file = %source,
                    elapsed_ms = stats.duration.as_millis() as u64,
                    "file complete"
                );
                FileOutcome::Loaded(stats)
            }
            Err((state, e)) => self.fail(start, source, Some(file.table.clone()), state, e),
        }
    }

    /// Run a query against the destination and replace `derived.name` with
    /// its result
    pub async fn run_derived(&mut self, derived: &DerivedTable) -> FileOutcome {
        let start = Instant::now();
        info!(table = %derived.name, "running derived query");

        let raw = match self.destination.execute_query(&derived.sql).await {
            Ok(result) => result.into_raw_table(),
            Err(e) => {
                return self.fail(
                    start,
                    derived.name.clone(),
                    None,
                    FileState::Reading,
                    IngestError::Query {
                        name: derived.name.clone(),
                        source: e,
                    },
                );
            }
        };

        let loader = match BatchLoader::new(DERIVED_CHUNK_SIZE, WriteMode::Replace) {
            Ok(loader) => loader,
            Err(e) => {
                return self.fail(
                    start,
                    derived.name.clone(),
                    None,
                    FileState::Pending,
                    IngestError::FatalConfig(e.to_string()),
                );
            }
        };

        match self.ingest_table(raw, &derived.name, loader).await {
            Ok(mut stats) => {
                stats.duration = start.elapsed();
                FileOutcome::Loaded(stats)
            }
            Err((state, e)) => self.fail(
                start,
                derived.name.clone(),
                Some(sanitize_name(&derived.name)),
                state,
                e,
            ),
        }
    }

    /// Load an in-memory table into `table_name`
    ///
    /// Sanitizes headers, normalizes date columns, resolves the destination
    /// table and writes it with `loader`. On failure returns the state the
    /// table had reached alongside the error.
    pub async fn ingest_table(
        &mut self,
        mut raw: RawTable,
        table_name: &str,
        loader: BatchLoader,
    ) -> Result<LoadStats, (FileState, IngestError)> {
        let table = sanitize_name(table_name);
        if table.is_empty() {
            return Err((
                FileState::Reading,
                IngestError::Inference {
                    table: table_name.to_string(),
                    message: "table name is empty after sanitizing".to_string(),
                },
            ));
        }

        let headers = sanitize_headers(&raw.columns, self.collision).map_err(|e| {
            (
                FileState::Reading,
                IngestError::NameCollision {
                    table: table.clone(),
                    source: e,
                },
            )
        })?;
        if let Some(idx) = headers.iter().position(String::is_empty) {
            return Err((
                FileState::Reading,
                IngestError::Inference {
                    table,
                    message: format!("column {} has an empty name after sanitizing", idx),
                },
            ));
        }
        raw.rename_columns(headers);

        for (column, pass) in normalize_table_dates(&mut raw, &table) {
            debug!(table = %table, column = %column, pass = ?pass, "date column normalized");
        }

        let ensured = self
            .context
            .ensure_table_with(&table, || infer_schema(&raw))
            .map_err(|e| {
                (
                    FileState::Reading,
                    IngestError::Inference {
                        table: table.clone(),
                        message: e.to_string(),
                    },
                )
            })?;
        debug!(table = %table, state = %FileState::SchemaResolved, created = ensured.is_new());

        debug!(table = %table, state = %FileState::Writing, rows = raw.row_count());
        let rows_stored = match loader.load(self.destination.as_ref(), &raw, &ensured).await {
            Ok(count) => count,
            Err(e) => {
                if ensured.is_new() {
                    self.context.forget_table(&table);
                }
                return Err((
                    FileState::Writing,
                    IngestError::from_load(&table, ensured.is_new(), e),
                ));
            }
        };

        let stats = LoadStats {
            file: None,
            table: table.clone(),
            rows_read: raw.row_count() as u64,
            rows_stored,
            created: ensured.is_new(),
            mode: loader.mode(),
            duration: Default::default(),
        };
        stats.verify();
        debug!(table = %table, state = %FileState::Verified);

        Ok(stats)
    }

    /// Close the destination
    pub async fn finish(self) -> Result<(), IngestError> {
        self.destination.close().await?;
        Ok(())
    }

    fn fail(
        &self,
        start: Instant,
        source: String,
        table: Option<String>,
        failed_in: FileState,
        error: IngestError,
    ) -> FileOutcome {
        error!(
            source = %source,
            table = table.as_deref().unwrap_or("-"),
            failed_in = %failed_in,
            kind = ?error.kind(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "{}",
            error
        );
        FileOutcome::Failed(FileFailure {
            source,
            table,
            failed_in,
            error,
        })
    }
}
