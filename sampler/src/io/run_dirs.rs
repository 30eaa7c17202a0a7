//! Scanning and creating `run_<n>` directories under an output root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::core::run_index::{next_start_index, run_dir_name};

/// Names of the immediate child directories of `root`.
///
/// A missing root has no children.
pub fn child_dir_names(root: &Path) -> Result<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry.context("read entry")?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("file type {}", entry.path().display()))?;
        if file_type.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Start index for the next batch under `root`.
///
/// Not atomic: batches against the same root must not overlap.
pub fn scan_next_start(root: &Path) -> Result<u64> {
    let names = child_dir_names(root)?;
    next_start_index(names.iter().map(String::as_str))
        .ok_or_else(|| anyhow!("run index space exhausted under {}", root.display()))
}

pub fn run_dir_path(root: &Path, index: u64) -> PathBuf {
    root.join(run_dir_name(index))
}

/// Create the directory for `index`. An existing directory is an error so
/// that output from an earlier trial is never reused.
pub fn create_run_dir(root: &Path, index: u64) -> Result<PathBuf> {
    let dir = run_dir_path(root, index);
    match fs::create_dir(&dir) {
        Ok(()) => Ok(dir),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            bail!("run directory {} already exists", dir.display())
        }
        Err(err) => Err(err).with_context(|| format!("create {}", dir.display())),
    }
}
