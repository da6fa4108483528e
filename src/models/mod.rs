//! Models module
//!
//! Defines the data structures that flow through the pipeline: raw tables read
//! from files, per-column profiles, inferred schemas and scalar values.

pub mod column;
pub mod enums;
pub mod table;
pub mod value;

pub use column::{Column, ColumnProfile};
pub use enums::*;
pub use table::{DuplicateColumnError, InferredSchema, RawTable};
pub use value::{Value, ValueKind};
