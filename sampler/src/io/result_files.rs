//! Discovery of simulator result files beneath a results root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Every regular file named `filename` anywhere below `root`, in walk order
/// (sorted by file name within each directory).
pub fn discover(root: &Path, filename: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if entry.file_type().is_file() && entry.file_name() == filename {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}
