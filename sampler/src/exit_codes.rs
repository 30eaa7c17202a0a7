//! Stable exit codes for sampler CLI commands.

/// Command succeeded; for `run`, every trial succeeded.
pub const OK: i32 = 0;
/// Invalid config or query, or an I/O error outside any single trial.
pub const INVALID: i32 = 1;
/// `sampler run` finished with at least one failed trial.
pub const TRIALS_FAILED: i32 = 2;
/// `sampler run` was cancelled before every trial launched.
pub const CANCELLED: i32 = 3;
