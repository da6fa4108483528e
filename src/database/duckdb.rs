//! DuckDB database backend implementation
//!
//! Provides an embedded destination using DuckDB, either file-based or
//! in-memory.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{
    DatabaseError, DatabaseResult, Destination, LoadPlan, QueryResult, SqlDialect, count_from_i64,
};
use crate::models::Value;

/// DuckDB database backend
///
/// Supports both file-based persistence and in-memory mode.
pub struct DuckDBBackend {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
}

impl DuckDBBackend {
    /// Create a new DuckDB backend with a file-based database
    pub fn new(db_path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::IoError(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let connection = duckdb::Connection::open(&path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory DuckDB backend
    ///
    /// Useful for testing or one-off runs where persistence is not needed.
    pub fn in_memory() -> DatabaseResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check if this is an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    fn lock(&self) -> DatabaseResult<std::sync::MutexGuard<'_, duckdb::Connection>> {
        self.connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    /// Convert a DuckDB ValueRef to a cell value
    fn value_ref_to_value(value: duckdb::types::ValueRef) -> Value {
        use duckdb::types::ValueRef;

        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Boolean(b) => Value::Boolean(b),
            ValueRef::TinyInt(i) => Value::Integer(i.into()),
            ValueRef::SmallInt(i) => Value::Integer(i.into()),
            ValueRef::Int(i) => Value::Integer(i.into()),
            ValueRef::BigInt(i) => Value::Integer(i),
            // SUM over BIGINT yields HUGEINT
            ValueRef::HugeInt(i) => i64::try_from(i)
                .map(Value::Integer)
                .unwrap_or(Value::Float(i as f64)),
            ValueRef::UTinyInt(i) => Value::Integer(i.into()),
            ValueRef::USmallInt(i) => Value::Integer(i.into()),
            ValueRef::UInt(i) => Value::Integer(i.into()),
            ValueRef::UBigInt(i) => i64::try_from(i)
                .map(Value::Integer)
                .unwrap_or(Value::Float(i as f64)),
            ValueRef::Float(f) => Value::Float(f.into()),
            ValueRef::Double(f) => Value::Float(f),
            ValueRef::Decimal(d) => d
                .to_string()
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::Text(d.to_string())),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Timestamp(unit, raw) => timestamp_from_micros(unit.to_micros(raw))
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),
            ValueRef::Date32(days) => timestamp_from_micros(i64::from(days) * 86_400_000_000)
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),
            other => Value::Text(format!("{:?}", other)),
        }
    }
}

fn timestamp_from_micros(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}

#[async_trait(?Send)]
impl Destination for DuckDBBackend {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::DuckDb
    }

    async fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult> {
        let start = std::time::Instant::now();
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        // In DuckDB 1.4+, we need to execute the query first, then get columns
        let mut result_rows = stmt
            .query([])
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = result_rows
            .next()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            let values = (0..column_count)
                .map(|i| {
                    row.get_ref(i)
                        .map(Self::value_ref_to_value)
                        .unwrap_or(Value::Null)
                })
                .collect();
            rows.push(values);
        }

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn execute_plan(&self, plan: &LoadPlan) -> DatabaseResult<u64> {
        let mut conn = self.lock()?;

        // Dropping the transaction without commit rolls it back
        let tx = conn.transaction().map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to begin transaction: {}", e))
        })?;

        for statement in plan.statements() {
            tx.execute_batch(statement).map_err(|e| {
                DatabaseError::TransactionFailed(format!("{}: {}", plan.table, e))
            })?;
        }

        let count: i64 = tx
            .query_row(&plan.count, [], |row| row.get(0))
            .map_err(|e| DatabaseError::QueryFailed(format!("Count failed: {}", e)))?;

        tx.commit().map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to commit {}: {}", plan.table, e))
        })?;

        count_from_i64(count)
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{BatchLoader, RunContext};
    use crate::models::{Column, InferredSchema, RawTable, StorageType, WriteMode};

    fn load_plan(table: &str, rows: &[i64]) -> LoadPlan {
        let schema = InferredSchema::new(vec![Column::new("n", StorageType::Integer)]).unwrap();
        let raw = RawTable::new(
            vec!["n".to_string()],
            rows.iter().map(|n| vec![Value::Integer(*n)]).collect(),
        );
        let ensured = RunContext::default().ensure_table(table, &schema);
        BatchLoader::new(2, WriteMode::Append)
            .unwrap()
            .plan(&raw, &ensured, SqlDialect::DuckDb)
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let backend = DuckDBBackend::in_memory().unwrap();
        assert!(backend.is_in_memory());
        assert!(backend.db_path().is_none());
    }

    #[tokio::test]
    async fn test_health_check() {
        let backend = DuckDBBackend::in_memory().unwrap();
        assert!(backend.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_type() {
        let backend = DuckDBBackend::in_memory().unwrap();
        assert_eq!(backend.backend_type(), "duckdb");
    }

    #[tokio::test]
    async fn test_execute_plan_and_catalog() {
        let backend = DuckDBBackend::in_memory().unwrap();
        assert!(backend.table_names().await.unwrap().is_empty());

        let stored = backend
            .execute_plan(&load_plan("numbers", &[1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(stored, 3);
        assert_eq!(backend.table_names().await.unwrap(), vec!["numbers"]);
    }

    #[tokio::test]
    async fn test_failed_plan_rolls_back_create() {
        let backend = DuckDBBackend::in_memory().unwrap();
        let mut plan = load_plan("broken", &[1, 2, 3]);
        plan.inserts
            .push("INSERT INTO \"broken\" (\"n\") VALUES ('not a number')".to_string());

        let err = backend.execute_plan(&plan).await.unwrap_err();
        assert!(matches!(err, DatabaseError::TransactionFailed(_)));
        assert!(backend.table_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_values() {
        let backend = DuckDBBackend::in_memory().unwrap();
        let result = backend
            .execute_query(
                "SELECT 1 AS i, 2.5::DOUBLE AS f, TRUE AS b, 'x' AS t, \
                 TIMESTAMP '2024-01-05 00:00:00' AS ts, NULL AS n, SUM(x) AS s \
                 FROM (VALUES (1), (2)) v(x)",
            )
            .await
            .unwrap();
        assert_eq!(result.columns.len(), 7);
        let row = &result.rows[0];
        assert_eq!(row[0], Value::Integer(1));
        assert_eq!(row[1], Value::Float(2.5));
        assert_eq!(row[2], Value::Boolean(true));
        assert_eq!(row[3], Value::from("x"));
        assert_eq!(row[4].to_string(), "2024-01-05 00:00:00");
        assert_eq!(row[5], Value::Null);
        assert_eq!(row[6], Value::Integer(3));
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ingest.duckdb");
        {
            let backend = DuckDBBackend::new(&path).unwrap();
            backend
                .execute_plan(&load_plan("kept", &[7]))
                .await
                .unwrap();
        }
        let reopened = DuckDBBackend::new(&path).unwrap();
        assert_eq!(reopened.table_names().await.unwrap(), vec!["kept"]);
    }
}
