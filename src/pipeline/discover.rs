//! Source file discovery

use std::path::{Path, PathBuf};

use super::error::IngestError;
use crate::inference::sanitize_name;

/// A CSV file to ingest and the table it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Canonical table name, from the file stem
    pub table: String,
}

impl SourceFile {
    pub fn new(path: PathBuf) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            table: sanitize_name(&stem),
            path,
        }
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Discover CSV files matching a pattern in a local directory
///
/// Only regular files with a `.csv` extension (any case) are returned,
/// sorted by path.
pub fn discover_csv_files(base_path: &Path, pattern: &str) -> Result<Vec<SourceFile>, IngestError> {
    if !base_path.is_dir() {
        return Err(IngestError::FatalConfig(format!(
            "Source directory not found: {}",
            base_path.display()
        )));
    }

    let full_pattern = base_path.join(pattern);
    let entries = glob::glob(&full_pattern.to_string_lossy()).map_err(|e| {
        IngestError::FatalConfig(format!("Invalid file pattern {}: {}", pattern, e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() && is_csv(&path) {
                    files.push(SourceFile::new(path));
                }
            }
            Err(e) => {
                // Log but continue
                tracing::warn!("Error accessing path: {}", e);
            }
        }
    }

    // Sort by path for consistent ordering
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_sorted_csv_only() {
        let dir = TempDir::new().unwrap();
        for name in ["sales.csv", "Begin Inventory.CSV", "notes.txt", "a.csv"] {
            std::fs::write(dir.path().join(name), "x\n1\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = discover_csv_files(dir.path(), "*").unwrap();
        let tables: Vec<&str> = files.iter().map(|f| f.table.as_str()).collect();
        assert_eq!(tables, vec!["begin_inventory", "a", "sales"]);
    }

    #[test]
    fn test_pattern_filters() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sales.csv"), "x\n").unwrap();
        std::fs::write(dir.path().join("purchases.csv"), "x\n").unwrap();

        let files = discover_csv_files(dir.path(), "sales*.csv").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].table, "sales");
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let err = discover_csv_files(Path::new("/no/such/dir"), "*.csv").unwrap_err();
        assert!(err.is_fatal());
    }
}
