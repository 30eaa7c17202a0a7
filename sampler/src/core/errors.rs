//! Typed errors for failures callers may want to match on.
//!
//! I/O layers wrap these in `anyhow::Error` with path context; use
//! `downcast_ref` to recover the variant.

use std::path::PathBuf;

use thiserror::Error;

/// A malformed metric query, rejected before any file is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("metric query must name at least one metric")]
    NoMetrics,
    #[error("metric identifier at position {position} is empty")]
    EmptyMetric { position: usize },
    #[error("a reducer is required when extracting {metric_count} metrics")]
    MissingReducer { metric_count: usize },
    #[error("reducer `{reducer}` takes {arity} value(s) but the query names {metric_count} metric(s)")]
    ArityMismatch {
        reducer: String,
        arity: usize,
        metric_count: usize,
    },
}

/// A result file that could not supply a requested metric.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("metric `{metric}` not found in {}", .path.display())]
    MetricNotFound { path: PathBuf, metric: String },
    #[error("metric `{metric}` in {} has malformed value `{value}`", .path.display())]
    MalformedValue {
        path: PathBuf,
        metric: String,
        value: String,
    },
}

/// A delimited record that could not be parsed back into values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is missing")]
    Missing,
    #[error("expected a single record, found another on line {line}")]
    ExtraRecord { line: usize },
    #[error("field {position} is not a number: `{field}`")]
    InvalidField { position: usize, field: String },
}
