//! Saving and loading scalar sequences as single-record CSV files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::record::{format_record, parse_record};
use crate::io::config::write_atomic;

/// Write `values` as one comma-delimited record, replacing `path`.
pub fn save_record(path: &Path, values: &[f64]) -> Result<()> {
    write_atomic(path, &format_record(values))
}

/// Read the single record stored at `path`.
pub fn load_record(path: &Path) -> Result<Vec<f64>> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_record(&contents).with_context(|| format!("parse {}", path.display()))
}
