//! I/O helpers for sampler commands.

pub mod config;
pub mod process;
pub mod record_store;
pub mod result_files;
pub mod run_dirs;
