//! Test-only helpers: temporary result trees and a scriptable fake
//! simulator.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// A temporary output root that is removed on drop.
pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create temp dir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<root>/<run>/stats.txt`.
    pub fn write_stats(&self, run: &str, contents: &str) -> Result<PathBuf> {
        let dir = self.path().join(run);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join("stats.txt");
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Create empty `run_<n>` directories.
    pub fn create_runs(&self, indices: impl IntoIterator<Item = u64>) -> Result<()> {
        for index in indices {
            let dir = self.path().join(format!("run_{index}"));
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }

    /// Sorted names of the immediate child directories.
    pub fn dir_names(&self) -> Result<Vec<String>> {
        crate::io::run_dirs::child_dir_names(self.path())
    }
}

/// Executable and arguments for a fake simulator built on `sh -c`.
///
/// The script sees the output directory in `$dir` (parsed from the trailing
/// `--outdir=<dir>` argument), e.g. `echo "simInsts 10" > "$dir/stats.txt"`.
pub fn fake_simulator(script: &str) -> (PathBuf, Vec<String>) {
    let body = format!("dir=\"${{1#--outdir=}}\"\n{script}");
    (
        PathBuf::from("sh"),
        vec!["-c".to_string(), body, "fake-sim".to_string()],
    )
}

/// Fake simulator writing `simInsts <1000 * (n + 1)>` for `run_<n>`.
pub fn fake_gem5() -> (PathBuf, Vec<String>) {
    fake_simulator(
        "n=\"${dir##*run_}\"\nprintf 'simInsts %s\\nsimSeconds 0.5\\n' \"$(( (n + 1) * 1000 ))\" > \"$dir/stats.txt\"",
    )
}
