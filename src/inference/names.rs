//! Name sanitization for destination tables and columns

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Characters replaced by an underscore in canonical names
const SEPARATORS: [char; 4] = [' ', '-', '.', '/'];

/// Normalize an arbitrary file or column name into a canonical identifier.
///
/// Trims surrounding whitespace, lower-cases, and replaces each space, hyphen,
/// period and slash with an underscore. The function is idempotent.
///
/// ```rust
/// use tabular_ingest::inference::sanitize_name;
///
/// assert_eq!(sanitize_name("  Sales Date "), "sales_date");
/// assert_eq!(sanitize_name("Vendor-No./Region"), "vendor_no__region");
/// ```
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { '_' } else { c })
        .collect()
}

/// What to do when two headers sanitize to the same canonical name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Fail the file (default)
    #[default]
    Reject,
    /// Keep the first header as is and suffix later ones with `_2`, `_3`, ...
    Suffix,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(CollisionPolicy::Reject),
            "suffix" => Ok(CollisionPolicy::Suffix),
            _ => Err(format!(
                "Unknown collision policy: {}. Use 'reject' or 'suffix'.",
                s
            )),
        }
    }
}

/// Two or more headers collapse to the same canonical name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Headers {originals:?} all sanitize to '{canonical}'")]
pub struct NameCollision {
    /// The shared canonical name
    pub canonical: String,
    /// Original headers that produced it, in source order
    pub originals: Vec<String>,
}

/// Sanitize a header row, applying `policy` to canonical-name collisions.
pub fn sanitize_headers(
    headers: &[String],
    policy: CollisionPolicy,
) -> Result<Vec<String>, NameCollision> {
    let bases: Vec<String> = headers.iter().map(|h| sanitize_name(h)).collect();

    match policy {
        CollisionPolicy::Reject => {
            let mut seen = HashSet::with_capacity(bases.len());
            for base in &bases {
                if !seen.insert(base.as_str()) {
                    let originals = headers
                        .iter()
                        .zip(&bases)
                        .filter(|(_, b)| *b == base)
                        .map(|(h, _)| h.clone())
                        .collect();
                    return Err(NameCollision {
                        canonical: base.clone(),
                        originals,
                    });
                }
            }
            Ok(bases)
        }
        CollisionPolicy::Suffix => {
            let reserved: HashSet<&str> = bases.iter().map(String::as_str).collect();
            let mut used: HashSet<String> = HashSet::with_capacity(bases.len());
            let mut out = Vec::with_capacity(bases.len());

            for base in &bases {
                let name = if used.contains(base) {
                    let mut n = 2;
                    loop {
                        let candidate = format!("{}_{}", base, n);
                        if !used.contains(&candidate) && !reserved.contains(candidate.as_str()) {
                            break candidate;
                        }
                        n += 1;
                    }
                } else {
                    base.clone()
                };
                used.insert(name.clone());
                out.push(name);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("InventoryId"), "inventoryid");
        assert_eq!(sanitize_name(" Begin Inventory "), "begin_inventory");
        assert_eq!(sanitize_name("a-b.c/d e"), "a_b_c_d_e");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for name in ["Sales.Date", "  X-Y  ", "already_clean", "Ünïcode Näme", "a//b"] {
            let once = sanitize_name(name);
            assert_eq!(sanitize_name(&once), once);
            assert!(!once.contains([' ', '-', '.', '/']));
            assert!(!once.chars().any(char::is_uppercase));
        }
    }

    #[test]
    fn test_reject_collision() {
        let err = sanitize_headers(&headers(&["Store", "store ", "City"]), CollisionPolicy::Reject)
            .unwrap_err();
        assert_eq!(err.canonical, "store");
        assert_eq!(err.originals, headers(&["Store", "store "]));
    }

    #[test]
    fn test_suffix_collision() {
        let out = sanitize_headers(
            &headers(&["Price", "price", "Price_2", "PRICE"]),
            CollisionPolicy::Suffix,
        )
        .unwrap();
        assert_eq!(out, headers(&["price", "price_3", "price_2", "price_4"]));
    }

    #[test]
    fn test_no_collision_passes_through() {
        let out = sanitize_headers(&headers(&["A", "B"]), CollisionPolicy::Reject).unwrap();
        assert_eq!(out, headers(&["a", "b"]));
    }
}
