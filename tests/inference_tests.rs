//! Tests for reading CSV data and inferring destination schemas

use tabular_ingest::import::CsvImporter;
use tabular_ingest::inference::{
    CollisionPolicy, DateContext, DateConversion, DatePass, infer_schema, infer_storage_type,
    normalize_dates, normalize_table_dates, sanitize_headers, sanitize_name,
};
use tabular_ingest::models::{RawTable, StorageType, Value};

fn read(csv: &str) -> RawTable {
    CsvImporter::new()
        .import_reader(csv.as_bytes(), "inline.csv")
        .unwrap()
}

fn prepared(csv: &str, table: &str) -> RawTable {
    let mut raw = read(csv);
    let headers = sanitize_headers(&raw.columns, CollisionPolicy::Reject).unwrap();
    raw.rename_columns(headers);
    normalize_table_dates(&mut raw, table);
    raw
}

#[test]
fn test_type_precedence() {
    assert_eq!(
        infer_storage_type(&[Value::from(1i64), Value::from(2i64), Value::from(3i64)]),
        StorageType::Integer
    );
    assert_eq!(
        infer_storage_type(&[Value::from(1i64), Value::from(2.5)]),
        StorageType::Float
    );
    assert_eq!(
        infer_storage_type(&[Value::from(true), Value::from(false)]),
        StorageType::Boolean
    );
    assert_eq!(
        infer_storage_type(&[Value::from("a"), Value::from("b")]),
        StorageType::Text
    );
}

#[test]
fn test_csv_to_schema() {
    let raw = prepared(
        "InventoryId,Store,Brand,Description,Size,onHand,Price,startDate,Active\n\
         1_HARDERSFIELD_58,1,58,Gekkeikan Black & Gold Sake,750mL,11,12.99,2024-01-01,true\n\
         1_HARDERSFIELD_60,1,60,Canadian Club 1858 VAP,750mL,7,10.99,2024-01-01,false\n\
         1_HARDERSFIELD_62,1,62,Herradura Silver Tequila,750mL,,36.99,2024-01-02,\n",
        "begin_inventory",
    );
    let schema = infer_schema(&raw).unwrap();

    let expected = [
        ("inventoryid", StorageType::Text),
        ("store", StorageType::Integer),
        ("brand", StorageType::Integer),
        ("description", StorageType::Text),
        ("size", StorageType::Text),
        ("onhand", StorageType::Integer),
        ("price", StorageType::Float),
        ("startdate", StorageType::Timestamp),
        ("active", StorageType::Boolean),
    ];
    assert_eq!(schema.len(), expected.len());
    for (name, storage_type) in expected {
        assert_eq!(schema.storage_type(name), Some(storage_type), "column {}", name);
    }
}

#[test]
fn test_all_null_column_gets_bounded_string() {
    let raw = prepared("id,comment\n1,\n2,NA\n", "notes");
    let schema = infer_schema(&raw).unwrap();
    assert_eq!(
        schema.storage_type("comment"),
        Some(StorageType::BoundedString(255))
    );
}

#[test]
fn test_iso_majority_converts() {
    let mut values: Vec<Value> = (1..=6)
        .map(|d| Value::from(format!("2024-03-0{}", d)))
        .collect();
    values.extend(["pending", "unknown", "tbd", "later"].map(Value::from));

    let ctx = DateContext {
        table: "sales",
        column: "salesdate",
    };
    match normalize_dates(&values, ctx) {
        DateConversion::Converted {
            pass,
            values: converted,
            ..
        } => {
            assert_eq!(pass, DatePass::Iso);
            assert_eq!(converted.iter().filter(|v| !v.is_null()).count(), 6);
            assert!(converted[6..].iter().all(Value::is_null));
        }
        other => panic!("expected conversion, got {:?}", other),
    }
}

#[test]
fn test_date_minority_left_untouched() {
    let csv = "receivingdate\n2024-01-05\n05/01/2024\n2024-01-07\nsoon\nlate\nnever\n\
               maybe\nlost\nheld\nreturned\n";
    let original = read(csv).column_values(0);
    let raw = prepared(csv, "purchases");
    assert_eq!(raw.column_values(0), original);
    assert!(raw.column_values(0).iter().all(|v| v.as_text().is_some()));
}

#[test]
fn test_day_first_fallback_in_table() {
    let raw = prepared(
        "PODate,Quantity\n05/01/2024,3\n06/01/2024,4\n13/01/2024,1\n",
        "purchases",
    );
    let dates: Vec<String> = raw.column_values(0).iter().map(|v| v.to_string()).collect();
    assert_eq!(
        dates,
        vec![
            "2024-01-05 00:00:00",
            "2024-01-06 00:00:00",
            "2024-01-13 00:00:00"
        ]
    );
}

#[test]
fn test_non_date_columns_keep_text() {
    let raw = prepared("Description,Update\n2024-01-01,2024-01-01\n", "t");
    // "description" mentions neither "date" nor "dt"; "update" does
    assert_eq!(raw.rows[0][0], Value::from("2024-01-01"));
    assert!(matches!(raw.rows[0][1], Value::Timestamp(_)));
}

#[test]
fn test_header_sanitization_matches_table_names() {
    let headers = vec!["Vendor Number".to_string(), "Sales.Dollars".to_string()];
    let canonical = sanitize_headers(&headers, CollisionPolicy::Reject).unwrap();
    assert_eq!(canonical, vec!["vendor_number", "sales_dollars"]);
    assert_eq!(sanitize_name("End-Inventory"), "end_inventory");
}
