//! Batch runner for independent simulator trials and extractor for the
//! scalar metrics they report.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (run-index allocation over a
//!   name snapshot, metric queries and reducers, metric search over text,
//!   the CSV record format, batch reports). No I/O.
//! - **[`io`]**: Side-effecting operations (config file, child processes,
//!   run directories, result file discovery, record files).
//!
//! Orchestration modules ([`sample`], [`extract`]) combine the two to
//! implement the CLI commands.

pub mod core;
pub mod exit_codes;
pub mod extract;
pub mod io;
pub mod logging;
pub mod sample;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
