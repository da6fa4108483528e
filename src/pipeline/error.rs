//! Pipeline error types

use serde::{Deserialize, Serialize};

use crate::database::DatabaseError;
use crate::import::ImportError;
use crate::inference::NameCollision;

/// Error raised while ingesting one file or query result
///
/// Everything except [`IngestError::FatalConfig`] is scoped to a single file:
/// the orchestrator logs it and moves on to the next file.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    SourceRead {
        path: String,
        #[source]
        source: ImportError,
    },

    #[error("Header collision in {table}: {source}")]
    NameCollision {
        table: String,
        #[source]
        source: NameCollision,
    },

    #[error("Schema inference failed for {table}: {message}")]
    Inference { table: String, message: String },

    #[error("Rows for {table} do not fit the existing table: {source}")]
    SchemaConflict {
        table: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Load into {table} rolled back: {source}")]
    Transaction {
        table: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Derived query {name} failed: {source}")]
    Query {
        name: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Fatal configuration error: {0}")]
    FatalConfig(String),
}

/// Classification of an [`IngestError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceRead,
    NameCollision,
    Inference,
    SchemaConflict,
    Transaction,
    Query,
    FatalConfig,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::SourceRead { .. } => ErrorKind::SourceRead,
            IngestError::NameCollision { .. } => ErrorKind::NameCollision,
            IngestError::Inference { .. } => ErrorKind::Inference,
            IngestError::SchemaConflict { .. } => ErrorKind::SchemaConflict,
            IngestError::Transaction { .. } => ErrorKind::Transaction,
            IngestError::Query { .. } => ErrorKind::Query,
            IngestError::FatalConfig(_) => ErrorKind::FatalConfig,
        }
    }

    /// Whether the run cannot continue
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::FatalConfig
    }

    /// Classify a failed load: statement errors against a table that existed
    /// before this file are schema conflicts, everything else a transaction
    /// failure.
    pub fn from_load(table: &str, table_was_new: bool, source: DatabaseError) -> Self {
        match source {
            DatabaseError::TransactionFailed(_) if !table_was_new => IngestError::SchemaConflict {
                table: table.to_string(),
                source,
            },
            source => IngestError::Transaction {
                table: table.to_string(),
                source,
            },
        }
    }
}

impl From<DatabaseError> for IngestError {
    fn from(err: DatabaseError) -> Self {
        IngestError::FatalConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_classification() {
        let conflict = IngestError::from_load(
            "sales",
            false,
            DatabaseError::TransactionFailed("could not convert".to_string()),
        );
        assert_eq!(conflict.kind(), ErrorKind::SchemaConflict);

        let fresh = IngestError::from_load(
            "sales",
            true,
            DatabaseError::TransactionFailed("could not convert".to_string()),
        );
        assert_eq!(fresh.kind(), ErrorKind::Transaction);

        let lost = IngestError::from_load(
            "sales",
            false,
            DatabaseError::ConnectionFailed("gone".to_string()),
        );
        assert_eq!(lost.kind(), ErrorKind::Transaction);
    }

    #[test]
    fn test_fatal() {
        let err: IngestError = DatabaseError::ConnectionFailed("refused".to_string()).into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("refused"));
    }
}
