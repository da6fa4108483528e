//! Storage type inference

use tracing::debug;

use crate::models::{
    Column, DEFAULT_STRING_LENGTH, DuplicateColumnError, InferredSchema, RawTable, StorageType,
    Value, ValueKind,
};

/// Map a column's observed values to a destination storage type.
///
/// Decision order over the non-null values, first match wins:
///
/// 1. all integral → [`StorageType::Integer`]
/// 2. all numeric → [`StorageType::Float`]
/// 3. all boolean → [`StorageType::Boolean`]
/// 4. all timestamps → [`StorageType::Timestamp`]
/// 5. any free-form text → [`StorageType::Text`]
/// 6. otherwise (no values, or a mix of non-text kinds) →
///    [`StorageType::BoundedString`] of [`DEFAULT_STRING_LENGTH`]
pub fn infer_storage_type(values: &[Value]) -> StorageType {
    let mut kinds: Vec<ValueKind> = Vec::new();
    for kind in values.iter().filter_map(Value::kind) {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    if kinds.is_empty() {
        return StorageType::BoundedString(DEFAULT_STRING_LENGTH);
    }

    let all = |allowed: &[ValueKind]| kinds.iter().all(|k| allowed.contains(k));

    if all(&[ValueKind::Integer]) {
        StorageType::Integer
    } else if all(&[ValueKind::Integer, ValueKind::Float]) {
        StorageType::Float
    } else if all(&[ValueKind::Boolean]) {
        StorageType::Boolean
    } else if all(&[ValueKind::Timestamp]) {
        StorageType::Timestamp
    } else if kinds.contains(&ValueKind::Text) {
        StorageType::Text
    } else {
        StorageType::BoundedString(DEFAULT_STRING_LENGTH)
    }
}

/// Infer a schema for every column of `table`.
///
/// Column names are taken as they are; callers sanitize headers first.
pub fn infer_schema(table: &RawTable) -> Result<InferredSchema, DuplicateColumnError> {
    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let storage_type = infer_storage_type(&table.column_values(idx));
            if let StorageType::BoundedString(_) = storage_type {
                debug!(column = %name, "no confident type match, using bounded string");
            }
            Column::new(name.clone(), storage_type)
        })
        .collect();

    InferredSchema::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_integers() {
        let values = vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)];
        assert_eq!(infer_storage_type(&values), StorageType::Integer);
    }

    #[test]
    fn test_mixed_numeric_is_float() {
        let values = vec![Value::Integer(1), Value::Float(2.5)];
        assert_eq!(infer_storage_type(&values), StorageType::Float);
    }

    #[test]
    fn test_booleans() {
        let values = vec![Value::Boolean(true), Value::Null, Value::Boolean(false)];
        assert_eq!(infer_storage_type(&values), StorageType::Boolean);
    }

    #[test]
    fn test_timestamps() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let values = vec![Value::Timestamp(ts), Value::Null];
        assert_eq!(infer_storage_type(&values), StorageType::Timestamp);
    }

    #[test]
    fn test_text() {
        let values = vec![Value::from("a"), Value::from("b")];
        assert_eq!(infer_storage_type(&values), StorageType::Text);
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(
            infer_storage_type(&[Value::Null, Value::Null]),
            StorageType::BoundedString(255)
        );
        assert_eq!(
            infer_storage_type(&[Value::Boolean(true), Value::Integer(1)]),
            StorageType::BoundedString(255)
        );
    }

    #[test]
    fn test_infer_schema() {
        let table = RawTable::new(
            vec!["id".to_string(), "price".to_string(), "name".to_string()],
            vec![
                vec![Value::Integer(1), Value::Float(9.99), Value::from("x")],
                vec![Value::Integer(2), Value::Integer(5), Value::Null],
            ],
        );
        let schema = infer_schema(&table).unwrap();
        let types: Vec<StorageType> = schema.columns().iter().map(|c| c.storage_type).collect();
        assert_eq!(
            types,
            vec![StorageType::Integer, StorageType::Float, StorageType::Text]
        );
    }
}
