//! Destination abstraction for loading inferred tables
//!
//! This module provides the destination layer the pipeline writes to:
//! - DuckDB: embedded database, file-based or in-memory (default)
//! - PostgreSQL: pooled connections for server deployments
//!
//! Every file is loaded by handing a [`LoadPlan`] to a [`Destination`], which
//! runs the whole plan inside one transaction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// Re-export implementations based on features
#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub mod loader;
pub mod schema;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDBBackend;

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresBackend;

pub use loader::{BatchLoader, DEFAULT_CHUNK_SIZE, DERIVED_CHUNK_SIZE, LoadPlan};
pub use schema::{EnsuredTable, RunContext, TableDefinition, quote_identifier};

use crate::models::{RawTable, StorageType, Value};

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed and was rolled back
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// SQL flavour spoken by a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlDialect {
    DuckDb,
    Postgres,
}

impl SqlDialect {
    /// Column type name for a storage type
    pub fn type_name(&self, storage_type: StorageType) -> String {
        match (self, storage_type) {
            (_, StorageType::Integer) => "BIGINT".to_string(),
            (SqlDialect::DuckDb, StorageType::Float) => "DOUBLE".to_string(),
            (SqlDialect::Postgres, StorageType::Float) => "DOUBLE PRECISION".to_string(),
            (_, StorageType::Boolean) => "BOOLEAN".to_string(),
            (_, StorageType::Timestamp) => "TIMESTAMP".to_string(),
            (_, StorageType::Text) => "TEXT".to_string(),
            (_, StorageType::BoundedString(len)) => format!("VARCHAR({})", len),
        }
    }

    /// Catalog reflection query listing the tables of the working schema
    pub fn catalog_sql(&self) -> &'static str {
        match self {
            SqlDialect::DuckDb => {
                "SELECT CAST(table_name AS TEXT) AS table_name FROM information_schema.tables \
                 WHERE table_schema = 'main'"
            }
            SqlDialect::Postgres => {
                "SELECT CAST(table_name AS TEXT) AS table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema()"
            }
        }
    }

    /// Statement removing every row of a table, inside the running transaction
    pub fn truncate_sql(&self, table: &str) -> String {
        match self {
            // DuckDB's TRUNCATE is an alias of DELETE; spell it out
            SqlDialect::DuckDb => format!("DELETE FROM {}", quote_identifier(table)),
            SqlDialect::Postgres => format!("TRUNCATE TABLE {}", quote_identifier(table)),
        }
    }
}

/// Query result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data, in column order
    pub rows: Vec<Vec<Value>>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Turn the result set into a table that can be ingested
    pub fn into_raw_table(self) -> RawTable {
        RawTable::new(self.columns, self.rows)
    }
}

/// Destination trait for catalog, load and query operations
///
/// This trait defines the interface for destination backends (DuckDB,
/// PostgreSQL). All operations are async so the pooled PostgreSQL backend can
/// be driven; DuckDB does its work synchronously inside the async methods.
#[async_trait(?Send)]
pub trait Destination: Send + Sync {
    /// SQL dialect used to render statements for this destination
    fn dialect(&self) -> SqlDialect;

    /// Execute a SQL query and return results
    async fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult>;

    /// Execute a load plan inside one transaction
    ///
    /// Runs the optional create and truncate statements, every insert chunk
    /// and finally the count query. Returns the row count observed by the
    /// count query before commit. On any failure the transaction is rolled
    /// back and nothing of the plan persists.
    async fn execute_plan(&self, plan: &LoadPlan) -> DatabaseResult<u64>;

    /// Names of the tables that currently exist in the working schema
    async fn table_names(&self) -> DatabaseResult<Vec<String>> {
        let result = self.execute_query(self.dialect().catalog_sql()).await?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Check database connectivity
    async fn health_check(&self) -> DatabaseResult<bool> {
        let result = self.execute_query("SELECT 1 AS healthy").await?;
        Ok(!result.is_empty())
    }

    /// Get the backend type name
    fn backend_type(&self) -> &'static str;

    /// Close the database connection
    async fn close(&self) -> DatabaseResult<()> {
        Ok(())
    }
}

/// Convert a count returned by a destination into a row count
pub(crate) fn count_from_i64(count: i64) -> DatabaseResult<u64> {
    u64::try_from(count)
        .map_err(|_| DatabaseError::QueryFailed(format!("Negative row count: {}", count)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(SqlDialect::DuckDb.type_name(StorageType::Float), "DOUBLE");
        assert_eq!(
            SqlDialect::Postgres.type_name(StorageType::Float),
            "DOUBLE PRECISION"
        );
        assert_eq!(
            SqlDialect::Postgres.type_name(StorageType::BoundedString(255)),
            "VARCHAR(255)"
        );
        assert_eq!(SqlDialect::DuckDb.type_name(StorageType::Integer), "BIGINT");
    }

    #[test]
    fn test_truncate_sql() {
        assert_eq!(
            SqlDialect::Postgres.truncate_sql("sales"),
            "TRUNCATE TABLE \"sales\""
        );
        assert_eq!(SqlDialect::DuckDb.truncate_sql("sales"), "DELETE FROM \"sales\"");
    }

    #[test]
    fn test_query_result_into_raw_table() {
        let result = QueryResult::new(
            vec!["n".to_string()],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        );
        assert_eq!(result.scalar(), Some(&Value::Integer(1)));
        let table = result.into_raw_table();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns, vec!["n".to_string()]);
    }
}
