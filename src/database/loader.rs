//! Chunked, transactional loading
//!
//! [`BatchLoader`] turns a normalized [`RawTable`] into a [`LoadPlan`]: the
//! ordered statements one file's transaction runs, ending with a row-count
//! query used for verification.

use tracing::{debug, info};

use super::schema::{EnsuredTable, quote_identifier};
use super::{DatabaseError, DatabaseResult, Destination, SqlDialect};
use crate::models::{RawTable, Value, WriteMode};

/// Default rows per insert statement for file loads
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Rows per insert statement for derived (query result) loads
pub const DERIVED_CHUNK_SIZE: usize = 2_000;

/// Render a value as a SQL literal
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) if f.is_nan() => "'NaN'".to_string(),
        Value::Float(f) if f.is_infinite() && *f > 0.0 => "'Infinity'".to_string(),
        Value::Float(f) if f.is_infinite() => "'-Infinity'".to_string(),
        Value::Float(f) => format!("{:?}", f),
        Value::Boolean(true) => "TRUE".to_string(),
        Value::Boolean(false) => "FALSE".to_string(),
        Value::Timestamp(ts) => format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Statements one file's transaction executes, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    /// Target table
    pub table: String,
    /// `CREATE TABLE`, when the table is new this run
    pub create: Option<String>,
    /// Row removal, for full-replace loads into an existing table
    pub truncate: Option<String>,
    /// One multi-row `INSERT` per chunk
    pub inserts: Vec<String>,
    /// `SELECT COUNT(*)` used for verification
    pub count: String,
    /// Rows carried by the inserts
    pub row_count: usize,
}

impl LoadPlan {
    /// Every statement before the count query, in execution order
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.create
            .iter()
            .chain(self.truncate.iter())
            .chain(self.inserts.iter())
            .map(String::as_str)
    }
}

/// Writes rows in bounded chunks inside one transaction per file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLoader {
    chunk_size: usize,
    mode: WriteMode,
}

impl BatchLoader {
    /// Create a loader; a chunk size of zero is a configuration error
    pub fn new(chunk_size: usize, mode: WriteMode) -> DatabaseResult<Self> {
        if chunk_size == 0 {
            return Err(DatabaseError::ConfigError(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(Self { chunk_size, mode })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Build the statements that load `table` into `ensured`
    pub fn plan(&self, table: &RawTable, ensured: &EnsuredTable, dialect: SqlDialect) -> LoadPlan {
        let target = quote_identifier(&ensured.name);
        let create = ensured.create.as_ref().map(|def| def.create_sql(dialect));
        let truncate = match (self.mode, &create) {
            (WriteMode::Replace, None) => Some(dialect.truncate_sql(&ensured.name)),
            _ => None,
        };

        let column_list = table
            .columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        let inserts = table
            .rows
            .chunks(self.chunk_size)
            .map(|chunk| {
                let values = chunk
                    .iter()
                    .map(|row| {
                        let cells: Vec<String> = row.iter().map(render_literal).collect();
                        format!("({})", cells.join(", "))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("INSERT INTO {} ({}) VALUES {}", target, column_list, values)
            })
            .collect();

        LoadPlan {
            table: ensured.name.clone(),
            create,
            truncate,
            inserts,
            count: format!("SELECT COUNT(*) FROM {}", target),
            row_count: table.row_count(),
        }
    }

    /// Load `table` and return the row count the destination reports after
    /// the write, observed inside the same transaction.
    pub async fn load(
        &self,
        destination: &dyn Destination,
        table: &RawTable,
        ensured: &EnsuredTable,
    ) -> DatabaseResult<u64> {
        let plan = self.plan(table, ensured, destination.dialect());
        debug!(
            table = %plan.table,
            rows = plan.row_count,
            chunks = plan.inserts.len(),
            mode = %self.mode,
            "executing load plan"
        );

        let stored = destination.execute_plan(&plan).await?;
        info!(
            table = %plan.table,
            rows_written = plan.row_count,
            rows_stored = stored,
            "load committed"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::RunContext;
    use crate::models::{Column, InferredSchema, StorageType};
    use chrono::NaiveDate;

    fn table(rows: usize) -> RawTable {
        RawTable::new(
            vec!["id".to_string(), "name".to_string()],
            (0..rows)
                .map(|i| vec![Value::Integer(i as i64), Value::from(format!("n{}", i))])
                .collect(),
        )
    }

    fn schema() -> InferredSchema {
        InferredSchema::new(vec![
            Column::new("id", StorageType::Integer),
            Column::new("name", StorageType::Text),
        ])
        .unwrap()
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            BatchLoader::new(0, WriteMode::Append),
            Err(DatabaseError::ConfigError(_))
        ));
    }

    #[test]
    fn test_render_literal() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(render_literal(&Value::Null), "NULL");
        assert_eq!(render_literal(&Value::Integer(-4)), "-4");
        assert_eq!(render_literal(&Value::Float(3.0)), "3.0");
        assert_eq!(render_literal(&Value::Float(f64::NAN)), "'NaN'");
        assert_eq!(render_literal(&Value::Float(f64::NEG_INFINITY)), "'-Infinity'");
        assert_eq!(render_literal(&Value::Boolean(true)), "TRUE");
        assert_eq!(
            render_literal(&Value::Timestamp(ts)),
            "TIMESTAMP '2024-01-05 08:30:00'"
        );
        assert_eq!(render_literal(&Value::from("O'Brien")), "'O''Brien'");
    }

    #[test]
    fn test_plan_chunks_rows() {
        let mut ctx = RunContext::default();
        let ensured = ctx.ensure_table("items", &schema());
        let loader = BatchLoader::new(2, WriteMode::Append).unwrap();

        let plan = loader.plan(&table(5), &ensured, SqlDialect::DuckDb);
        assert!(plan.create.is_some());
        assert!(plan.truncate.is_none());
        assert_eq!(plan.inserts.len(), 3);
        assert_eq!(plan.row_count, 5);
        assert_eq!(
            plan.inserts[2],
            "INSERT INTO \"items\" (\"id\", \"name\") VALUES (4, 'n4')"
        );
        assert_eq!(plan.count, "SELECT COUNT(*) FROM \"items\"");
        assert_eq!(plan.statements().count(), 4);
    }

    #[test]
    fn test_replace_truncates_existing_table_only() {
        let loader = BatchLoader::new(DERIVED_CHUNK_SIZE, WriteMode::Replace).unwrap();

        let mut ctx = RunContext::from_catalog(["summary"]);
        let existing = ctx.ensure_table("summary", &schema());
        let plan = loader.plan(&table(1), &existing, SqlDialect::Postgres);
        assert_eq!(plan.truncate.as_deref(), Some("TRUNCATE TABLE \"summary\""));

        let fresh = ctx.ensure_table("other", &schema());
        let plan = loader.plan(&table(1), &fresh, SqlDialect::Postgres);
        assert!(plan.truncate.is_none());
    }

    #[test]
    fn test_empty_table_has_no_inserts() {
        let loader = BatchLoader::new(DEFAULT_CHUNK_SIZE, WriteMode::Append).unwrap();
        let mut ctx = RunContext::default();
        let ensured = ctx.ensure_table("empty", &schema());
        let plan = loader.plan(&table(0), &ensured, SqlDialect::DuckDb);
        assert!(plan.inserts.is_empty());
    }
}
