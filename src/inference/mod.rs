//! Schema inference
//!
//! Turns an untyped [`crate::models::RawTable`] into something a destination
//! can store:
//!
//! - [`names`]: canonical table and column names, header collision handling
//! - [`dates`]: two-pass date detection for text columns
//! - [`types`]: storage type per column, first match wins

pub mod dates;
pub mod names;
pub mod types;

pub use dates::{
    DATE_THRESHOLD, DateContext, DateConversion, DatePass, is_date_column, normalize_dates,
    normalize_table_dates, parse_day_first, parse_iso,
};
pub use names::{CollisionPolicy, NameCollision, sanitize_headers, sanitize_name};
pub use types::{infer_schema, infer_storage_type};
