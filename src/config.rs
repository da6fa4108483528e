//! Configuration file support
//!
//! Handles parsing of `tabular-ingest.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::database::{DEFAULT_CHUNK_SIZE, DatabaseError, DatabaseResult};
use crate::inference::CollisionPolicy;
use crate::models::WriteMode;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "tabular-ingest.toml";

/// Default database filename for DuckDB
pub const DEFAULT_DUCKDB_FILENAME: &str = "ingest.duckdb";

/// DuckDB path selecting an in-memory database
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Default log file
pub const DEFAULT_LOG_FILE: &str = "logs/tabular_ingest.log";

/// Environment variable for the source directory
pub const ENV_SOURCE_DIR: &str = "INGEST_SOURCE_DIR";

/// Environment variable for database backend
pub const ENV_DB_BACKEND: &str = "INGEST_DB_BACKEND";

/// Environment variable for DuckDB path
pub const ENV_DUCKDB_PATH: &str = "INGEST_DUCKDB_PATH";

/// Environment variables for the PostgreSQL connection
pub const ENV_DB_USER: &str = "INGEST_DB_USER";
pub const ENV_DB_PASSWORD: &str = "INGEST_DB_PASSWORD";
pub const ENV_DB_HOST: &str = "INGEST_DB_HOST";
pub const ENV_DB_PORT: &str = "INGEST_DB_PORT";
pub const ENV_DB_NAME: &str = "INGEST_DB_NAME";

/// Environment variable for the insert chunk size
pub const ENV_CHUNK_SIZE: &str = "INGEST_CHUNK_SIZE";

/// Environment variable for the log level
pub const ENV_LOG_LEVEL: &str = "INGEST_LOG_LEVEL";

/// Destination backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// DuckDB embedded database (default)
    #[default]
    DuckDB,
    /// PostgreSQL database
    Postgres,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "duckdb" => Ok(BackendType::DuckDB),
            "postgres" | "postgresql" => Ok(BackendType::Postgres),
            _ => Err(format!(
                "Unknown database backend: {}. Use 'duckdb' or 'postgres'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::DuckDB => write!(f, "duckdb"),
            BackendType::Postgres => write!(f, "postgres"),
        }
    }
}

/// Source files section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Directory holding the CSV files
    #[serde(default = "default_source_dir")]
    pub directory: PathBuf,

    /// Glob pattern matched inside the directory
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_pattern() -> String {
    "*.csv".to_string()
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            directory: default_source_dir(),
            pattern: default_pattern(),
        }
    }
}

/// PostgreSQL configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSection {
    #[serde(default = "default_user")]
    pub user: String,

    /// Only ever read from the environment
    #[serde(skip)]
    pub password: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_pool_size() -> usize {
    5
}

impl Default for PostgresSection {
    fn default() -> Self {
        Self {
            user: default_user(),
            password: None,
            host: default_host(),
            port: default_port(),
            database: default_database(),
            pool_size: default_pool_size(),
        }
    }
}

impl PostgresSection {
    /// Assemble a `postgresql://` connection string, URL-encoding credentials
    pub fn connection_string(&self) -> String {
        let credentials = match &self.password {
            Some(password) => format!(
                "{}:{}",
                urlencoding::encode(&self.user),
                urlencoding::encode(password)
            ),
            None => urlencoding::encode(&self.user).into_owned(),
        };
        format!(
            "postgresql://{}@{}:{}/{}",
            credentials, self.host, self.port, self.database
        )
    }
}

/// Destination configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationSection {
    /// Destination backend type
    #[serde(default)]
    pub backend: BackendType,

    /// Path to DuckDB database file, or `:memory:`
    #[serde(default = "default_duckdb_path")]
    pub path: String,

    /// PostgreSQL-specific configuration
    #[serde(default)]
    pub postgres: PostgresSection,
}

fn default_duckdb_path() -> String {
    DEFAULT_DUCKDB_FILENAME.to_string()
}

impl Default for DestinationSection {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            path: default_duckdb_path(),
            postgres: PostgresSection::default(),
        }
    }
}

/// Load behaviour section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSection {
    /// Rows per insert statement
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Append, or truncate then append
    #[serde(default)]
    pub mode: WriteMode,

    /// Handling of headers that sanitize to the same name
    #[serde(default)]
    pub collision: CollisionPolicy,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for LoadSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            mode: WriteMode::default(),
            collision: CollisionPolicy::default(),
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log file, appended to; empty disables file logging
    #[serde(default = "default_log_file")]
    pub file: String,

    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_level(),
        }
    }
}

/// A query whose result replaces a destination table after the file loads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTable {
    pub name: String,
    pub sql: String,
}

/// Main configuration structure
///
/// Represents the `tabular-ingest.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub source: SourceSection,

    #[serde(default)]
    pub destination: DestinationSection,

    #[serde(default)]
    pub load: LoadSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<DerivedTable>,
}

impl IngestConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration writing to an in-memory DuckDB
    pub fn in_memory(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: SourceSection {
                directory: source_dir.into(),
                ..Default::default()
            },
            destination: DestinationSection {
                path: IN_MEMORY_PATH.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load configuration from a file
    ///
    /// Falls back to defaults if the file does not exist. Environment
    /// variable overrides are applied either way.
    pub fn load(config_path: &Path) -> DatabaseResult<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| DatabaseError::IoError(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> DatabaseResult<Self> {
        toml::from_str(content)
            .map_err(|e| DatabaseError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a file
    pub fn save(&self, config_path: &Path) -> DatabaseResult<()> {
        let content = self.to_toml()?;

        std::fs::write(config_path, content)
            .map_err(|e| DatabaseError::IoError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> DatabaseResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DatabaseError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> DatabaseResult<()> {
        if self.load.chunk_size == 0 {
            return Err(DatabaseError::ConfigError(
                "load.chunk_size must be at least 1".to_string(),
            ));
        }
        if let Some(derived) = self
            .derived
            .iter()
            .find(|d| d.name.trim().is_empty() || d.sql.trim().is_empty())
        {
            return Err(DatabaseError::ConfigError(format!(
                "derived table '{}' needs both a name and a query",
                derived.name
            )));
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_SOURCE_DIR) {
            self.source.directory = PathBuf::from(dir);
        }

        // Backend type
        if let Some(backend) = lookup(ENV_DB_BACKEND)
            && let Ok(backend_type) = backend.parse()
        {
            self.destination.backend = backend_type;
        }

        // DuckDB path
        if let Some(path) = lookup(ENV_DUCKDB_PATH) {
            self.destination.path = path;
        }

        // PostgreSQL connection
        let pg = &mut self.destination.postgres;
        if let Some(user) = lookup(ENV_DB_USER) {
            pg.user = user;
        }
        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            pg.password = Some(password);
        }
        if let Some(host) = lookup(ENV_DB_HOST) {
            pg.host = host;
        }
        if let Some(port) = lookup(ENV_DB_PORT)
            && let Ok(port) = port.parse()
        {
            pg.port = port;
        }
        if let Some(name) = lookup(ENV_DB_NAME) {
            pg.database = name;
        }

        if let Some(size) = lookup(ENV_CHUNK_SIZE)
            && let Ok(size) = size.parse()
        {
            self.load.chunk_size = size;
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
    }

    /// Whether the DuckDB destination is in-memory
    pub fn is_in_memory(&self) -> bool {
        self.destination.path == IN_MEMORY_PATH
    }

    /// Source directory, resolved against `base_dir`
    pub fn source_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.source.directory)
    }

    /// Get the DuckDB database path, resolved against `base_dir`
    pub fn duckdb_path(&self, base_dir: &Path) -> PathBuf {
        if self.destination.path.is_empty() {
            base_dir.join(DEFAULT_DUCKDB_FILENAME)
        } else if Path::new(&self.destination.path).is_absolute() {
            PathBuf::from(&self.destination.path)
        } else {
            base_dir.join(&self.destination.path)
        }
    }

    /// Log file path, `None` when file logging is disabled
    pub fn log_file(&self) -> Option<&Path> {
        if self.logging.file.is_empty() {
            None
        } else {
            Some(Path::new(&self.logging.file))
        }
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# tabular-ingest configuration

[source]
# Directory scanned for CSV files, and the pattern matched inside it
directory = "data"
pattern = "*.csv"

[destination]
# Destination backend: "duckdb" (default) or "postgres"
backend = "duckdb"

# DuckDB database file, or ":memory:"
path = "ingest.duckdb"

# PostgreSQL connection (used when backend = "postgres").
# The password is read from INGEST_DB_PASSWORD only.
[destination.postgres]
user = "postgres"
host = "localhost"
port = 5432
database = "postgres"
pool_size = 5

[load]
# Rows per INSERT statement
chunk_size = 10000
# "append" (default) or "replace"
mode = "append"
# Headers that sanitize to the same name: "reject" (default) or "suffix"
collision = "reject"

[logging]
file = "logs/tabular_ingest.log"
level = "info"

# Queries whose result replaces a destination table after the files load
# [[derived]]
# name = "vendor_sales_summary"
# sql = "SELECT vendornumber, SUM(salesdollars) AS total_sales FROM sales GROUP BY vendornumber"
"#
}
