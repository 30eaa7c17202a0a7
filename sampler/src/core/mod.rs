//! Deterministic, pure logic shared by the sampler.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data (directory name snapshots, file contents, value slices) and return
//! deterministic outputs suitable for tests.

pub mod cancel;
pub mod errors;
pub mod metric;
pub mod query;
pub mod record;
pub mod report;
pub mod run_index;
