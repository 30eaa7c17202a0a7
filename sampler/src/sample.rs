//! Batch orchestration: allocate run indices, launch trials with bounded
//! parallelism, collect one outcome per index.
//!
//! Each trial owns `<root>/run_<index>` exclusively. Uniqueness only holds
//! while no other batch targets the same root; the caller must serialize
//! batches per root.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::core::cancel::CancellationToken;
use crate::core::report::{BatchReport, TrialOutcome, TrialStatus};
use crate::core::run_index::batch_range;
use crate::io::config::BatchConfig;
use crate::io::process::run_command;
use crate::io::run_dirs::{create_run_dir, run_dir_path, scan_next_start};

const STDERR_TAIL_BYTES: usize = 2_000;

/// One batch of trials to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub output_root: PathBuf,
    pub samples: u32,
    pub concurrency: usize,
    pub outdir_flag: String,
    pub trial_timeout: Option<Duration>,
    pub output_limit_bytes: usize,
    pub fail_fast: bool,
}

impl BatchRequest {
    /// Request with default flag and limits.
    pub fn new(
        executable: impl Into<PathBuf>,
        args: Vec<String>,
        output_root: impl Into<PathBuf>,
        samples: u32,
        concurrency: usize,
    ) -> Self {
        let defaults = BatchConfig::default();
        Self {
            executable: executable.into(),
            args,
            output_root: output_root.into(),
            samples,
            concurrency,
            outdir_flag: defaults.outdir_flag,
            trial_timeout: None,
            output_limit_bytes: defaults.output_limit_bytes,
            fail_fast: false,
        }
    }

    pub fn from_config(cfg: &BatchConfig) -> Self {
        Self {
            executable: PathBuf::from(&cfg.executable),
            args: cfg.args.clone(),
            output_root: cfg.output_root.clone(),
            samples: cfg.samples,
            concurrency: cfg.concurrency,
            outdir_flag: cfg.outdir_flag.clone(),
            trial_timeout: cfg.trial_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
            fail_fast: cfg.fail_fast,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(anyhow!("concurrency must be > 0"));
        }
        if self.executable.as_os_str().is_empty() {
            return Err(anyhow!("executable must be set"));
        }
        if self.outdir_flag.trim().is_empty() {
            return Err(anyhow!("output directory flag must be non-empty"));
        }
        Ok(())
    }

    fn trial(&self, run_index: u64) -> TrialSpec {
        TrialSpec {
            executable: self.executable.clone(),
            args: self.args.clone(),
            output_root: self.output_root.clone(),
            run_index,
            outdir_flag: self.outdir_flag.clone(),
            timeout: self.trial_timeout,
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

/// Everything one worker needs to launch one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub output_root: PathBuf,
    pub run_index: u64,
    pub outdir_flag: String,
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl TrialSpec {
    pub fn run_dir(&self) -> PathBuf {
        run_dir_path(&self.output_root, self.run_index)
    }

    /// The simulator invocation: `<executable> <args..> <flag>=<run dir>`.
    pub fn command(&self, run_dir: &Path) -> Command {
        let mut outdir = OsString::from(&self.outdir_flag);
        outdir.push("=");
        outdir.push(run_dir);
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args).arg(outdir);
        cmd
    }
}

/// Run `request.samples` trials under `request.output_root` and block until
/// all of them have finished or been cancelled.
///
/// Trial failures are recorded in the report, not returned as errors. Errors
/// are reserved for problems preparing the batch itself. With `fail_fast`,
/// the first failure cancels `cancel`.
#[instrument(skip_all, fields(root = %request.output_root.display(), samples = request.samples, concurrency = request.concurrency))]
pub fn run_samples(request: &BatchRequest, cancel: &CancellationToken) -> Result<BatchReport> {
    request.validate()?;
    let start_index = scan_next_start(&request.output_root)?;
    let indices = batch_range(start_index, request.samples).ok_or_else(|| {
        anyhow!(
            "cannot schedule {} runs from index {start_index} under {}: run index space exhausted",
            request.samples,
            request.output_root.display()
        )
    })?;
    fs::create_dir_all(&request.output_root)
        .with_context(|| format!("create output root {}", request.output_root.display()))?;

    let started_at = Utc::now();
    info!(start_index, end_index = indices.end, "batch started");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(request.concurrency)
        .thread_name(|i| format!("sampler-trial-{i}"))
        .build()
        .context("build trial pool")?;

    let mut trials: Vec<TrialOutcome> = pool.install(|| {
        indices
            .into_par_iter()
            .map(|run_index| {
                let spec = request.trial(run_index);
                let outcome = run_trial(&spec, cancel);
                if request.fail_fast && outcome.status.is_failure() {
                    warn!(run_index, "trial failed, cancelling remaining trials");
                    cancel.cancel();
                }
                outcome
            })
            .collect()
    });
    trials.sort_by_key(|trial| trial.run_index);

    let report = BatchReport {
        output_root: request.output_root.clone(),
        start_index,
        requested: request.samples,
        started_at: started_at.to_rfc3339(),
        finished_at: Utc::now().to_rfc3339(),
        trials,
    };
    info!(
        succeeded = report.succeeded().len(),
        failed = report.failed().len(),
        cancelled = report.cancelled().len(),
        "batch finished"
    );
    Ok(report)
}

/// Create the trial's run directory and run the simulator in it.
#[instrument(skip_all, fields(run_index = spec.run_index))]
pub fn run_trial(spec: &TrialSpec, cancel: &CancellationToken) -> TrialOutcome {
    if cancel.is_cancelled() {
        debug!("batch cancelled, skipping trial");
        return TrialOutcome::cancelled(spec.run_index, spec.run_dir());
    }

    let started = Instant::now();
    let run_dir = match create_run_dir(&spec.output_root, spec.run_index) {
        Ok(dir) => dir,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "could not create run directory");
            return launch_failed(spec, format!("{err:#}"), started);
        }
    };

    debug!(run_dir = %run_dir.display(), "launching trial");
    let output = match run_command(spec.command(&run_dir), spec.timeout, spec.output_limit_bytes)
    {
        Ok(output) => output,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "trial failed to launch");
            return launch_failed(spec, format!("{err:#}"), started);
        }
    };

    let status = if output.timed_out {
        TrialStatus::TimedOut {
            timeout_secs: spec.timeout.map_or(0, |t| t.as_secs()),
        }
    } else if output.status.success() {
        TrialStatus::Succeeded
    } else {
        TrialStatus::Failed {
            exit_code: output.status.code(),
        }
    };
    if status.is_success() {
        debug!("trial succeeded");
    } else {
        warn!(status = %status.label(), "trial did not succeed");
    }

    TrialOutcome {
        run_index: spec.run_index,
        run_dir,
        status,
        duration_secs: started.elapsed().as_secs_f64(),
        stderr_tail: output.stderr_tail(STDERR_TAIL_BYTES),
    }
}

fn launch_failed(spec: &TrialSpec, error: String, started: Instant) -> TrialOutcome {
    TrialOutcome {
        run_index: spec.run_index,
        run_dir: spec.run_dir(),
        status: TrialStatus::LaunchFailed { error },
        duration_secs: started.elapsed().as_secs_f64(),
        stderr_tail: String::new(),
    }
}
