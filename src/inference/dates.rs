//! Heuristic date detection for text columns
//!
//! A column is a candidate when its canonical name contains `date` or `dt`
//! and every non-null value is text. Conversion is attempted in two passes:
//!
//! 1. strict ISO `YYYY-MM-DD`
//! 2. lenient, day-first (month-first only when the day-first reading is
//!    impossible)
//!
//! A pass is accepted when more than half of the non-null values parse under
//! it; values the accepted pass could not parse become null. When neither
//! pass clears the threshold the column is left exactly as it was.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info};

use crate::models::{RawTable, Value};

/// Minimum (exclusive) fraction of parsed values for a pass to be accepted
pub const DATE_THRESHOLD: f64 = 0.5;

/// Strict ISO date pattern used by the first pass
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Patterns for strings that start with a four-digit year
const YEAR_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];
const YEAR_FIRST_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Day-first patterns.
///
/// Two-digit-year patterns come before their four-digit counterparts since
/// `%y` refuses four digits while `%Y` happily reads `24` as year 24.
const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];
const DAY_FIRST_DATE_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d/%m/%Y",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%d.%m.%y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
];

/// Month-first patterns, only reached when the day-first reading is invalid
/// (e.g. `12/25/2024`) or the month is spelled out first.
const MONTH_FIRST_DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];
const MONTH_FIRST_DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

/// Table and column a conversion applies to, used for logging
#[derive(Debug, Clone, Copy)]
pub struct DateContext<'a> {
    pub table: &'a str,
    pub column: &'a str,
}

/// Which pass produced an accepted conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePass {
    Iso,
    DayFirst,
}

/// Result of [`normalize_dates`]
#[derive(Debug, Clone, PartialEq)]
pub enum DateConversion {
    /// The column was converted; unparsed values are null
    Converted {
        pass: DatePass,
        fraction: f64,
        values: Vec<Value>,
    },
    /// Neither pass cleared [`DATE_THRESHOLD`]; the column is unchanged
    Unconverted {
        iso_fraction: f64,
        day_first_fraction: f64,
    },
}

/// Whether a canonical column name marks a date candidate
pub fn is_date_column(name: &str) -> bool {
    name.contains("date") || name.contains("dt")
}

/// Strict ISO parse (`YYYY-MM-DD`)
pub fn parse_iso(raw: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn starts_with_year(s: &str) -> bool {
    s.len() >= 4 && s.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}

/// Lenient, day-first parse of a date or date-time string
pub fn parse_day_first(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    let candidates: [(&[&str], &[&str]); 2] = if starts_with_year(s) {
        [
            (YEAR_FIRST_DATETIME_FORMATS, YEAR_FIRST_DATE_FORMATS),
            (&[], &[]),
        ]
    } else {
        [
            (DAY_FIRST_DATETIME_FORMATS, DAY_FIRST_DATE_FORMATS),
            (MONTH_FIRST_DATETIME_FORMATS, MONTH_FIRST_DATE_FORMATS),
        ]
    };

    for (datetime_formats, date_formats) in candidates {
        for format in datetime_formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Some(dt);
            }
        }
        for format in date_formats {
            if let Ok(d) = NaiveDate::parse_from_str(s, format) {
                return Some(d.and_time(NaiveTime::MIN));
            }
        }
    }

    None
}

/// Apply `parse` to every text value; returns the converted column and the
/// number of successfully parsed values.
fn convert_with(values: &[Value], parse: fn(&str) -> Option<NaiveDateTime>) -> (Vec<Value>, usize) {
    let mut parsed = 0;
    let converted = values
        .iter()
        .map(|v| match v.as_text().and_then(parse) {
            Some(ts) => {
                parsed += 1;
                Value::Timestamp(ts)
            }
            None => Value::Null,
        })
        .collect();
    (converted, parsed)
}

/// Run the two-pass date heuristic over one column.
///
/// The denominator is the number of non-null values, floored at 1, so an
/// empty or all-null column fails both passes and stays unconverted.
pub fn normalize_dates(values: &[Value], ctx: DateContext<'_>) -> DateConversion {
    let non_null = values.iter().filter(|v| !v.is_null()).count().max(1) as f64;

    let (iso_values, iso_parsed) = convert_with(values, parse_iso);
    let iso_fraction = iso_parsed as f64 / non_null;
    if iso_fraction > DATE_THRESHOLD {
        info!(
            table = ctx.table,
            column = ctx.column,
            fraction = iso_fraction,
            "Converted column to timestamp using ISO format"
        );
        return DateConversion::Converted {
            pass: DatePass::Iso,
            fraction: iso_fraction,
            values: iso_values,
        };
    }

    let (lenient_values, lenient_parsed) = convert_with(values, parse_day_first);
    let day_first_fraction = lenient_parsed as f64 / non_null;
    if day_first_fraction > DATE_THRESHOLD {
        info!(
            table = ctx.table,
            column = ctx.column,
            fraction = day_first_fraction,
            "Converted column to timestamp using day-first fallback"
        );
        return DateConversion::Converted {
            pass: DatePass::DayFirst,
            fraction: day_first_fraction,
            values: lenient_values,
        };
    }

    debug!(
        table = ctx.table,
        column = ctx.column,
        iso_fraction,
        day_first_fraction,
        "Left column as text, too few values look like dates"
    );
    DateConversion::Unconverted {
        iso_fraction,
        day_first_fraction,
    }
}

/// Normalize every date-candidate column of `table` in place.
///
/// Returns the names of the converted columns with the pass that converted
/// them.
pub fn normalize_table_dates(table: &mut RawTable, table_name: &str) -> Vec<(String, DatePass)> {
    let mut converted = Vec::new();

    for idx in 0..table.column_count() {
        let column = table.columns[idx].clone();
        if !is_date_column(&column) || !table.profile(idx).is_text() {
            continue;
        }

        let ctx = DateContext {
            table: table_name,
            column: &column,
        };
        if let DateConversion::Converted { pass, values, .. } =
            normalize_dates(&table.column_values(idx), ctx)
        {
            table.replace_column(idx, values);
            converted.push((column, pass));
        }
    }

    converted
}
