//! Sampler configuration stored in `sampler.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::query::{MetricQuery, ReducerName};

pub const DEFAULT_CONFIG_PATH: &str = "sampler.toml";

/// Sampler configuration (TOML).
///
/// Missing fields default to values that run one trial at a time into
/// `m5out/` and read `stats.txt` files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    pub batch: BatchConfig,
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchConfig {
    /// Simulator binary. Required for `sampler run`.
    pub executable: String,
    /// Arguments passed before the output directory flag.
    pub args: Vec<String>,
    /// Directory holding the `run_<n>` subdirectories.
    pub output_root: PathBuf,
    /// Trials per batch.
    pub samples: u32,
    /// Maximum trials running at once.
    pub concurrency: usize,
    /// Flag used to point the simulator at its run directory (`<flag>=<dir>`).
    pub outdir_flag: String,
    /// Per-trial wall-clock limit in seconds; unset means no limit.
    pub trial_timeout_secs: Option<u64>,
    /// Truncate captured stdout/stderr beyond this many bytes per trial.
    pub output_limit_bytes: usize,
    /// Stop launching new trials after the first failure.
    pub fail_fast: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            executable: String::new(),
            args: Vec::new(),
            output_root: PathBuf::from("m5out"),
            samples: 1,
            concurrency: 1,
            outdir_flag: "--outdir".to_string(),
            trial_timeout_secs: None,
            output_limit_bytes: 100_000,
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractConfig {
    /// File name searched for beneath the results root.
    pub result_filename: String,
    pub metrics: Vec<String>,
    pub reducer: Option<ReducerName>,
    /// Multiplier applied to every reduced value.
    pub scale: Option<f64>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            result_filename: "stats.txt".to_string(),
            metrics: Vec::new(),
            reducer: None,
            scale: None,
        }
    }
}

impl BatchConfig {
    pub fn trial_timeout(&self) -> Option<Duration> {
        self.trial_timeout_secs.map(Duration::from_secs)
    }
}

impl ExtractConfig {
    /// Build the metric query described by this section.
    pub fn query(&self) -> MetricQuery {
        let reducer = self.reducer.map(|name| name.build(self.metrics.len()));
        MetricQuery::new(self.metrics.clone(), reducer)
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        let batch = &self.batch;
        if batch.concurrency == 0 {
            return Err(anyhow!("batch.concurrency must be > 0"));
        }
        if batch.outdir_flag.trim().is_empty() {
            return Err(anyhow!("batch.outdir_flag must be non-empty"));
        }
        if batch.trial_timeout_secs == Some(0) {
            return Err(anyhow!("batch.trial_timeout_secs must be > 0 when set"));
        }
        if batch.output_limit_bytes == 0 {
            return Err(anyhow!("batch.output_limit_bytes must be > 0"));
        }
        if batch.output_root.as_os_str().is_empty() {
            return Err(anyhow!("batch.output_root must be non-empty"));
        }

        let extract = &self.extract;
        let filename = extract.result_filename.trim();
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(anyhow!(
                "extract.result_filename must be a bare file name, got `{}`",
                extract.result_filename
            ));
        }
        if let Some(scale) = extract.scale
            && !scale.is_finite()
        {
            return Err(anyhow!("extract.scale must be finite"));
        }
        Ok(())
    }

    /// Validation for `sampler run`, which also needs an executable.
    pub fn validate_for_run(&self) -> Result<()> {
        self.validate()?;
        if self.batch.executable.trim().is_empty() {
            return Err(anyhow!("batch.executable must be set"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SamplerConfig::default()`.
pub fn load_config(path: &Path) -> Result<SamplerConfig> {
    if !path.exists() {
        let cfg = SamplerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SamplerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SamplerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write `contents` next to `path` and rename it into place.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("path has no file name {}", path.display()))?;
    let tmp_path = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
