//! Metric extraction over a tree of simulator result files.
//!
//! A missing metric in any file aborts the whole extraction with the file
//! and metric named; no partial result set is returned.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::metric::{compile_patterns, read_metrics};
use crate::core::query::MetricQuery;
use crate::core::run_index::run_index_for_path;
use crate::io::result_files::discover;

/// One derived value and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Index of the nearest `run_<n>` directory containing the file.
    pub run_index: Option<u64>,
    pub path: PathBuf,
    pub value: f64,
}

/// Derived values, one per result file, ordered by run index.
///
/// Files outside any `run_<n>` directory come last, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    samples: Vec<Sample>,
}

impl ResultSet {
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(compare_samples);
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|sample| sample.value).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Apply post-processing to every value, keeping order and provenance.
    pub fn map_values(self, f: impl Fn(f64) -> f64) -> Self {
        let samples = self
            .samples
            .into_iter()
            .map(|sample| Sample {
                value: f(sample.value),
                ..sample
            })
            .collect();
        Self { samples }
    }
}

fn compare_samples(a: &Sample, b: &Sample) -> Ordering {
    match (a.run_index, b.run_index) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.path.cmp(&b.path)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.path.cmp(&b.path),
    }
}

/// Extract one derived value per `result_filename` file beneath `root`.
///
/// The query is validated before anything is read from disk.
#[instrument(skip_all, fields(root = %root.display(), metrics = ?query.metrics()))]
pub fn extract_metrics(root: &Path, query: &MetricQuery, result_filename: &str) -> Result<ResultSet> {
    let reducer = query.resolved_reducer().context("invalid metric query")?;
    let patterns = compile_patterns(query.metrics()).context("compile metric patterns")?;

    let files = discover(root, result_filename)?;
    if files.is_empty() {
        warn!(result_filename, "no result files found");
    }

    let mut samples = Vec::with_capacity(files.len());
    for path in files {
        let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let values = read_metrics(&path, &text, &patterns)?;
        let value = reducer.apply(&values);
        let run_index = run_index_for_path(root, &path);
        debug!(path = %path.display(), ?run_index, value, "extracted");
        samples.push(Sample {
            run_index,
            path,
            value,
        });
    }

    info!(files = samples.len(), reducer = reducer.name(), "extraction finished");
    Ok(ResultSet::new(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::{ExtractError, QueryError};
    use crate::core::query::Reducer;
    use tempfile::tempdir;

    fn write_stats(root: &Path, run: &str, contents: &str) {
        let dir = root.join(run);
        fs::create_dir_all(&dir).expect("run dir");
        fs::write(dir.join("stats.txt"), contents).expect("stats");
    }

    fn metrics(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn single_metric_passes_values_through() {
        let temp = tempdir().expect("tempdir");
        write_stats(temp.path(), "run_0", "simInsts 1000\n");
        write_stats(temp.path(), "run_1", "simInsts 2000\n");
        write_stats(temp.path(), "run_2", "simInsts 500\n");

        let result = extract_metrics(temp.path(), &MetricQuery::single("simInsts"), "stats.txt")
            .expect("extract");
        assert_eq!(result.values(), vec![1000.0, 2000.0, 500.0]);
    }

    #[test]
    fn reducer_combines_metrics_per_file() {
        let temp = tempdir().expect("tempdir");
        write_stats(temp.path(), "run_0", "a 10\nb 2\n");
        write_stats(temp.path(), "run_1", "b 4\na 20\n");

        let query =
            MetricQuery::with_reducer(metrics(&["a", "b"]), Reducer::binary("ratio", |x, y| x / y));
        let result = extract_metrics(temp.path(), &query, "stats.txt").expect("extract");
        assert_eq!(result.values(), vec![5.0, 5.0]);
    }

    #[test]
    fn orders_by_run_index_not_name() {
        let temp = tempdir().expect("tempdir");
        write_stats(temp.path(), "run_10", "x 10\n");
        write_stats(temp.path(), "run_2", "x 2\n");
        write_stats(temp.path(), "run_1", "x 1\n");
        write_stats(temp.path(), "loose", "x 99\n");

        let result =
            extract_metrics(temp.path(), &MetricQuery::single("x"), "stats.txt").expect("extract");
        assert_eq!(result.values(), vec![1.0, 2.0, 10.0, 99.0]);
        let indices: Vec<Option<u64>> = result.samples().iter().map(|s| s.run_index).collect();
        assert_eq!(indices, vec![Some(1), Some(2), Some(10), None]);
    }

    #[test]
    fn arity_mismatch_rejected_before_reading() {
        let temp = tempdir().expect("tempdir");
        let missing_root = temp.path().join("does-not-exist");
        let query = MetricQuery::with_reducer(metrics(&["a", "b"]), Reducer::unary("neg", |x| -x));

        let err = extract_metrics(&missing_root, &query, "stats.txt").expect_err("rejected");
        assert!(matches!(
            err.downcast_ref::<QueryError>(),
            Some(QueryError::ArityMismatch {
                arity: 1,
                metric_count: 2,
                ..
            })
        ));
    }

    #[test]
    fn missing_reducer_rejected_before_reading() {
        let temp = tempdir().expect("tempdir");
        let query = MetricQuery::new(metrics(&["a", "b"]), None);
        let err = extract_metrics(&temp.path().join("absent"), &query, "stats.txt")
            .expect_err("rejected");
        assert_eq!(
            err.downcast_ref::<QueryError>(),
            Some(&QueryError::MissingReducer { metric_count: 2 })
        );
    }

    #[test]
    fn missing_metric_fails_whole_extraction() {
        let temp = tempdir().expect("tempdir");
        write_stats(temp.path(), "run_0", "a 1\nb 1\n");
        write_stats(temp.path(), "run_1", "a 2\n");

        let query = MetricQuery::with_reducer(metrics(&["a", "b"]), Reducer::binary("sum", |x, y| x + y));
        let err = extract_metrics(temp.path(), &query, "stats.txt").expect_err("missing b");
        assert_eq!(
            err.downcast_ref::<ExtractError>(),
            Some(&ExtractError::MetricNotFound {
                path: temp.path().join("run_1/stats.txt"),
                metric: "b".to_string(),
            })
        );
    }

    #[test]
    fn empty_tree_yields_empty_set() {
        let temp = tempdir().expect("tempdir");
        let result = extract_metrics(temp.path(), &MetricQuery::single("simInsts"), "stats.txt")
            .expect("extract");
        assert!(result.is_empty());
    }

    #[test]
    fn map_values_post_processes_in_order() {
        let temp = tempdir().expect("tempdir");
        write_stats(temp.path(), "run_0", "simInsts 1000\n");
        write_stats(temp.path(), "run_1", "simInsts 2000\n");
        write_stats(temp.path(), "run_2", "simInsts 500\n");

        let result = extract_metrics(temp.path(), &MetricQuery::single("simInsts"), "stats.txt")
            .expect("extract")
            .map_values(|x| x / 1000.0);
        assert_eq!(result.values(), vec![1.0, 2.0, 0.5]);
        assert_eq!(result.samples()[2].path, temp.path().join("run_2/stats.txt"));
    }
}
