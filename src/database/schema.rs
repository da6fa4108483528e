//! Destination table reconciliation
//!
//! A [`RunContext`] holds the catalog snapshot taken once at the start of a
//! run. It decides whether a destination table has to be created and keeps
//! the schema of every table it created, so later files targeting the same
//! table reuse it instead of re-inferring.

use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;

use tracing::{debug, info};

use super::SqlDialect;
use crate::models::InferredSchema;

/// Quote an identifier for use in SQL, doubling embedded quotes
///
/// ```rust
/// use tabular_ingest::database::quote_identifier;
///
/// assert_eq!(quote_identifier("sales"), "\"sales\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A table that has to be created, with its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub schema: InferredSchema,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, schema: InferredSchema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// `CREATE TABLE` statement in the given dialect
    pub fn create_sql(&self, dialect: SqlDialect) -> String {
        let columns: Vec<String> = self
            .schema
            .columns()
            .iter()
            .map(|c| {
                format!(
                    "{} {}",
                    quote_identifier(&c.name),
                    dialect.type_name(c.storage_type)
                )
            })
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&self.name),
            columns.join(", ")
        )
    }
}

/// Outcome of [`RunContext::ensure_table`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredTable {
    /// Canonical table name
    pub name: String,
    /// Definition to create, `None` when the table already exists
    pub create: Option<TableDefinition>,
}

impl EnsuredTable {
    pub fn is_new(&self) -> bool {
        self.create.is_some()
    }
}

/// Run-scoped view of which destination tables exist
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    known: BTreeSet<String>,
    created: HashMap<String, InferredSchema>,
}

impl RunContext {
    /// Start a run from a catalog snapshot
    pub fn from_catalog<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: tables.into_iter().map(Into::into).collect(),
            created: HashMap::new(),
        }
    }

    /// Whether the table is known to exist
    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Known table names, sorted
    pub fn known_tables(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }

    /// Schema of a table created during this run
    pub fn created_schema(&self, name: &str) -> Option<&InferredSchema> {
        self.created.get(name)
    }

    /// Decide whether `name` has to be created.
    ///
    /// If the table is absent it is recorded as known and its definition is
    /// returned; if it is present the call returns immediately without
    /// comparing schemas. Calling this twice never yields a second create.
    pub fn ensure_table(&mut self, name: &str, schema: &InferredSchema) -> EnsuredTable {
        match self.ensure_table_with(name, || Ok::<_, Infallible>(schema.clone())) {
            Ok(ensured) => ensured,
            Err(never) => match never {},
        }
    }

    /// Like [`ensure_table`](Self::ensure_table), but only computes the
    /// schema when the table actually has to be created.
    pub fn ensure_table_with<E>(
        &mut self,
        name: &str,
        infer: impl FnOnce() -> Result<InferredSchema, E>,
    ) -> Result<EnsuredTable, E> {
        if self.known.contains(name) {
            info!(table = %name, "table exists, skipping create");
            return Ok(EnsuredTable {
                name: name.to_string(),
                create: None,
            });
        }

        let schema = infer()?;
        info!(table = %name, columns = schema.len(), "table will be created");
        self.known.insert(name.to_string());
        self.created.insert(name.to_string(), schema.clone());
        Ok(EnsuredTable {
            name: name.to_string(),
            create: Some(TableDefinition::new(name, schema)),
        })
    }

    /// Undo an [`ensure_table`](Self::ensure_table) whose create was rolled back
    pub fn forget_table(&mut self, name: &str) {
        if self.created.remove(name).is_some() {
            self.known.remove(name);
            debug!(table = %name, "create rolled back, table forgotten");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, StorageType};

    fn schema() -> InferredSchema {
        InferredSchema::new(vec![
            Column::new("id", StorageType::Integer),
            Column::new("name", StorageType::BoundedString(255)),
        ])
        .unwrap()
    }

    #[test]
    fn test_create_sql() {
        let def = TableDefinition::new("vendors", schema());
        assert_eq!(
            def.create_sql(SqlDialect::DuckDb),
            "CREATE TABLE \"vendors\" (\"id\" BIGINT, \"name\" VARCHAR(255))"
        );
    }

    #[test]
    fn test_ensure_table_is_idempotent() {
        let mut ctx = RunContext::from_catalog(Vec::<String>::new());
        let first = ctx.ensure_table("sales", &schema());
        assert!(first.is_new());
        assert_eq!(first.name, "sales");

        let second = ctx.ensure_table("sales", &schema());
        assert!(!second.is_new());
        assert_eq!(second.name, "sales");
        assert!(ctx.created_schema("sales").is_some());
    }

    #[test]
    fn test_existing_table_is_not_created() {
        let mut ctx = RunContext::from_catalog(["purchases"]);
        let ensured = ctx.ensure_table("purchases", &schema());
        assert!(ensured.create.is_none());
        assert!(ctx.created_schema("purchases").is_none());
    }

    #[test]
    fn test_known_table_skips_inference() {
        let mut ctx = RunContext::from_catalog(["sales"]);
        let ensured = ctx
            .ensure_table_with("sales", || Err::<InferredSchema, _>("should not infer"))
            .unwrap();
        assert!(!ensured.is_new());

        let err = ctx
            .ensure_table_with("other", || Err::<InferredSchema, _>("no columns"))
            .unwrap_err();
        assert_eq!(err, "no columns");
        assert!(!ctx.is_known("other"));
    }

    #[test]
    fn test_forget_table() {
        let mut ctx = RunContext::from_catalog(["existing"]);
        ctx.ensure_table("fresh", &schema());
        ctx.forget_table("fresh");
        assert!(!ctx.is_known("fresh"));

        // Tables from the catalog snapshot are never forgotten
        ctx.forget_table("existing");
        assert!(ctx.is_known("existing"));

        assert!(ctx.ensure_table("fresh", &schema()).is_new());
    }
}
