//! Enums shared across the pipeline
//!
//! # Serde Casing Conventions
//!
//! - `lowercase`: configuration keywords (WriteMode)
//! - `PascalCase`: type names (StorageType)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default length of [`StorageType::BoundedString`] when inference has no
/// confident match.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Destination-side type assigned to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Integer,
    Float,
    Boolean,
    Timestamp,
    /// Unbounded text
    Text,
    /// Variable-length string with a maximum length
    BoundedString(u32),
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Integer => write!(f, "Integer"),
            StorageType::Float => write!(f, "Float"),
            StorageType::Boolean => write!(f, "Boolean"),
            StorageType::Timestamp => write!(f, "Timestamp"),
            StorageType::Text => write!(f, "Text"),
            StorageType::BoundedString(n) => write!(f, "BoundedString({})", n),
        }
    }
}

/// How rows are written into an existing destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Append rows; duplicates across runs are kept (default)
    #[default]
    Append,
    /// Truncate the table, then append (full-replace)
    Replace,
}

impl std::str::FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "append" => Ok(WriteMode::Append),
            "replace" => Ok(WriteMode::Replace),
            _ => Err(format!(
                "Unknown write mode: {}. Use 'append' or 'replace'.",
                s
            )),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Append => write!(f, "append"),
            WriteMode::Replace => write!(f, "replace"),
        }
    }
}
