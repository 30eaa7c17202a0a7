//! Per-trial outcomes and the batch report built from them.

use std::path::PathBuf;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// How a single trial ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialStatus {
    /// Process exited with status 0.
    Succeeded,
    /// Process exited non-zero or was terminated by a signal.
    Failed { exit_code: Option<i32> },
    /// Process exceeded the per-trial timeout and was killed.
    TimedOut { timeout_secs: u64 },
    /// Run directory could not be created or the process could not spawn.
    LaunchFailed { error: String },
    /// Skipped because the batch was cancelled before launch.
    Cancelled,
}

impl TrialStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed { .. } | Self::TimedOut { .. } | Self::LaunchFailed { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Succeeded => "ok".to_string(),
            Self::Failed {
                exit_code: Some(code),
            } => format!("failed (exit {code})"),
            Self::Failed { exit_code: None } => "failed (signal)".to_string(),
            Self::TimedOut { timeout_secs } => format!("timed out after {timeout_secs}s"),
            Self::LaunchFailed { error } => format!("launch failed: {error}"),
            Self::Cancelled => "cancelled".to_string(),
        }
    }
}

/// Result of one trial, keyed by its run index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub run_index: u64,
    pub run_dir: PathBuf,
    #[serde(flatten)]
    pub status: TrialStatus,
    pub duration_secs: f64,
    /// Tail of captured stderr (lossy UTF-8), empty when nothing ran.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr_tail: String,
}

impl TrialOutcome {
    pub fn cancelled(run_index: u64, run_dir: PathBuf) -> Self {
        Self {
            run_index,
            run_dir,
            status: TrialStatus::Cancelled,
            duration_secs: 0.0,
            stderr_tail: String::new(),
        }
    }
}

/// Everything a batch did, one entry per scheduled run index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub output_root: PathBuf,
    pub start_index: u64,
    pub requested: u32,
    pub started_at: String,
    pub finished_at: String,
    /// Sorted by run index.
    pub trials: Vec<TrialOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> Vec<u64> {
        self.indices_where(TrialStatus::is_success)
    }

    pub fn failed(&self) -> Vec<u64> {
        self.indices_where(TrialStatus::is_failure)
    }

    pub fn cancelled(&self) -> Vec<u64> {
        self.indices_where(TrialStatus::is_cancelled)
    }

    /// True only when every scheduled index succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.trials.len() == self.requested as usize
            && self.trials.iter().all(|trial| trial.status.is_success())
    }

    pub fn outcome(&self, run_index: u64) -> Option<&TrialOutcome> {
        self.trials.iter().find(|trial| trial.run_index == run_index)
    }

    pub fn summary(&self) -> String {
        format!(
            "batch: root={} runs={}..{} succeeded={} failed={} cancelled={}",
            self.output_root.display(),
            self.start_index,
            self.start_index.saturating_add(u64::from(self.requested)),
            self.succeeded().len(),
            self.failed().len(),
            self.cancelled().len()
        )
    }

    /// Turn a partially failed batch into an error listing the bad indices.
    pub fn ensure_success(&self) -> Result<()> {
        if self.all_succeeded() {
            return Ok(());
        }
        let failed = self.failed();
        let cancelled = self.cancelled();
        bail!(
            "batch incomplete: failed runs {:?}, cancelled runs {:?}",
            failed,
            cancelled
        );
    }

    fn indices_where(&self, pred: impl Fn(&TrialStatus) -> bool) -> Vec<u64> {
        self.trials
            .iter()
            .filter(|trial| pred(&trial.status))
            .map(|trial| trial.run_index)
            .collect()
    }
}
