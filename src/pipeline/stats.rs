//! Per-file outcomes and run statistics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{ErrorKind, IngestError};
use crate::models::WriteMode;

/// Processing state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Pending,
    Reading,
    SchemaResolved,
    Writing,
    Verified,
    Failed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileState::Pending => "pending",
            FileState::Reading => "reading",
            FileState::SchemaResolved => "schema_resolved",
            FileState::Writing => "writing",
            FileState::Verified => "verified",
            FileState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Statistics for one successfully loaded file or query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    /// Source file, `None` for derived tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Destination table
    pub table: String,
    /// Rows read from the source
    pub rows_read: u64,
    /// Rows counted in the destination after the write
    pub rows_stored: u64,
    /// Whether the table was created by this load
    pub created: bool,
    pub mode: WriteMode,
    /// Wall-clock time for the file
    #[serde(skip)]
    pub duration: Duration,
}

impl LoadStats {
    /// Whether the stored count is impossible for the write mode.
    ///
    /// Append loads may find pre-existing rows, so only a count below the
    /// rows written is suspicious; replace loads must match exactly.
    pub fn is_count_mismatch(&self) -> bool {
        match self.mode {
            WriteMode::Append => self.rows_stored < self.rows_read,
            WriteMode::Replace => self.rows_stored != self.rows_read,
        }
    }

    /// Log a warning if the stored count does not add up
    pub fn verify(&self) {
        if self.is_count_mismatch() {
            warn!(
                table = %self.table,
                rows_read = self.rows_read,
                rows_stored = self.rows_stored,
                mode = %self.mode,
                "row count after load does not match rows read"
            );
        }
    }
}

/// A file that could not be loaded
#[derive(Debug)]
pub struct FileFailure {
    /// Source file, or the derived table name
    pub source: String,
    /// Destination table, when known
    pub table: Option<String>,
    /// Last state reached before the failure
    pub failed_in: FileState,
    pub error: IngestError,
}

impl FileFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Result of processing one file
#[derive(Debug)]
pub enum FileOutcome {
    Loaded(LoadStats),
    Failed(FileFailure),
}

impl FileOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, FileOutcome::Loaded(_))
    }

    pub fn stats(&self) -> Option<&LoadStats> {
        match self {
            FileOutcome::Loaded(stats) => Some(stats),
            FileOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FileFailure> {
        match self {
            FileOutcome::Loaded(_) => None,
            FileOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Aggregate report for a pipeline run
///
/// Lists successfully loaded files only; failures are reported through the
/// log and counted in `files_failed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Number of files loaded
    pub files_processed: usize,
    /// Number of files that failed
    pub files_failed: usize,
    pub total_rows_read: u64,
    pub total_rows_stored: u64,
    /// Per-load statistics, in processing order
    pub loads: Vec<LoadStats>,
    /// Duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            ..Default::default()
        }
    }

    /// Fold one outcome into the summary
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Loaded(stats) => {
                self.files_processed += 1;
                self.total_rows_read += stats.rows_read;
                self.total_rows_stored += stats.rows_stored;
                self.loads.push(stats.clone());
            }
            FileOutcome::Failed(_) => self.files_failed += 1,
        }
    }

    /// Get rows per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_rows_read as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{:.2}s", self.duration.as_secs_f64())
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    /// Emit the summary through the log
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            files_processed = self.files_processed,
            files_failed = self.files_failed,
            rows_read = self.total_rows_read,
            rows_stored = self.total_rows_stored,
            duration = %self.duration_string(),
            "ingest summary"
        );
        for load in &self.loads {
            info!(
                table = %load.table,
                rows_read = load.rows_read,
                rows_stored = load.rows_stored,
                "  loaded"
            );
        }
    }
}
