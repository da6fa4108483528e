//! Column models: inferred columns and transient column profiles

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::StorageType;
use super::value::{Value, ValueKind};

/// Number of non-null values kept in [`ColumnProfile::sample`]
pub const PROFILE_SAMPLE_SIZE: usize = 5;

/// A named, typed column of an [`super::InferredSchema`]
///
/// # Example
///
/// ```rust
/// use tabular_ingest::models::{Column, StorageType};
///
/// let column = Column::new("order_id", StorageType::Integer);
/// assert_eq!(column.name, "order_id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Canonical column name
    pub name: String,
    /// Destination storage type
    pub storage_type: StorageType,
}

impl Column {
    pub fn new(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            name: name.into(),
            storage_type,
        }
    }
}

/// Per-column summary derived from a [`super::RawTable`]
///
/// Never persisted; used by type inference, date normalization and logging.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    /// Column name as it appears in the table
    pub name: String,
    /// First few non-null values
    pub sample: Vec<Value>,
    /// Number of non-null values
    pub non_null_count: usize,
    /// Number of text values matching the ISO `YYYY-MM-DD` pattern
    pub iso_date_matches: usize,
    /// Distinct kinds among the non-null values
    pub kinds: Vec<ValueKind>,
}

impl ColumnProfile {
    /// Profile a column from its values
    pub fn from_values(name: impl Into<String>, values: &[Value]) -> Self {
        let mut sample = Vec::with_capacity(PROFILE_SAMPLE_SIZE);
        let mut non_null_count = 0;
        let mut iso_date_matches = 0;
        let mut kinds = Vec::new();

        for value in values {
            let Some(kind) = value.kind() else {
                continue;
            };
            non_null_count += 1;
            if sample.len() < PROFILE_SAMPLE_SIZE {
                sample.push(value.clone());
            }
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
            if let Value::Text(s) = value
                && NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok()
            {
                iso_date_matches += 1;
            }
        }

        Self {
            name: name.into(),
            sample,
            non_null_count,
            iso_date_matches,
            kinds,
        }
    }

    /// True when every non-null value is text (and there is at least one)
    pub fn is_text(&self) -> bool {
        self.kinds == [ValueKind::Text]
    }

    /// True when the column holds no non-null values
    pub fn is_empty(&self) -> bool {
        self.non_null_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_counts() {
        let values = vec![
            Value::from("2024-01-05"),
            Value::Null,
            Value::from("not a date"),
            Value::from("2024-02-30"),
        ];
        let profile = ColumnProfile::from_values("order_date", &values);

        assert_eq!(profile.non_null_count, 3);
        // 2024-02-30 is not a real day
        assert_eq!(profile.iso_date_matches, 1);
        assert!(profile.is_text());
        assert_eq!(profile.sample.len(), 3);
    }

    #[test]
    fn test_profile_sample_is_bounded() {
        let values: Vec<Value> = (0..20).map(Value::Integer).collect();
        let profile = ColumnProfile::from_values("n", &values);
        assert_eq!(profile.sample.len(), PROFILE_SAMPLE_SIZE);
        assert!(!profile.is_text());
    }

    #[test]
    fn test_empty_profile() {
        let profile = ColumnProfile::from_values("x", &[Value::Null, Value::Null]);
        assert!(profile.is_empty());
        assert!(!profile.is_text());
    }
}
