//! Run directory naming and start-index allocation.
//!
//! Allocation is a pure function of a snapshot of directory names. It is not
//! atomic with respect to directory creation: two batches that snapshot the
//! same root before either creates its directories will pick the same start
//! index. Callers must serialize batches per output root.

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

const RUN_PREFIX: &str = "run_";

static RUN_DIR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^run_(\d+)$").expect("run dir pattern"));

/// Directory name for the given run index (`run_<index>`).
pub fn run_dir_name(index: u64) -> String {
    format!("{RUN_PREFIX}{index}")
}

/// Parse the index out of a `run_<index>` directory name.
///
/// Returns `None` for names that do not match exactly, including suffixes
/// too large for `u64`.
pub fn parse_run_index(name: &str) -> Option<u64> {
    let captures = RUN_DIR_NAME.captures(name)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Next unused start index: one past the highest `run_<n>` name, or 0.
///
/// `None` when the highest index is `u64::MAX` and no index is left.
pub fn next_start_index<'a, I>(names: I) -> Option<u64>
where
    I: IntoIterator<Item = &'a str>,
{
    match names.into_iter().filter_map(parse_run_index).max() {
        Some(max) => max.checked_add(1),
        None => Some(0),
    }
}

/// Contiguous index range for a batch of `count` trials, or `None` if it
/// would run past `u64::MAX`.
pub fn batch_range(start: u64, count: u32) -> Option<Range<u64>> {
    let end = start.checked_add(u64::from(count))?;
    Some(start..end)
}

/// Run index of the nearest `run_<n>` ancestor of `path` below `root`.
pub fn run_index_for_path(root: &Path, path: &Path) -> Option<u64> {
    let relative = path.strip_prefix(root).ok()?;
    relative
        .parent()?
        .ancestors()
        .filter_map(|dir| dir.file_name())
        .find_map(|name| parse_run_index(&name.to_string_lossy()))
}
