//! Metric queries and the reducers that combine per-trial values.
//!
//! A reducer declares its arity up front and receives the extracted values
//! as a slice in query order, so a query can be checked for consistency
//! without touching any result file.

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::errors::QueryError;

type ReduceFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Combines the values of one trial's metrics into a single scalar.
#[derive(Clone)]
pub struct Reducer {
    name: String,
    arity: usize,
    func: Arc<ReduceFn>,
}

impl Reducer {
    /// Reducer over exactly `arity` values.
    pub fn new<F>(name: impl Into<String>, arity: usize, func: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }

    /// Passes a single value through unchanged.
    pub fn identity() -> Self {
        Self::new("identity", 1, |values| values[0])
    }

    pub fn unary<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::new(name, 1, move |values| func(values[0]))
    }

    pub fn binary<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        Self::new(name, 2, move |values| func(values[0], values[1]))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Apply to one trial's values.
    ///
    /// Callers must pass exactly `arity` values; [`MetricQuery::validate`]
    /// guarantees this for extraction.
    pub fn apply(&self, values: &[f64]) -> f64 {
        debug_assert_eq!(values.len(), self.arity, "reducer arity");
        (self.func)(values)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Built-in reducers selectable from config files and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReducerName {
    /// The single metric, unchanged.
    Identity,
    /// First metric divided by the second.
    Ratio,
    /// First metric minus the second.
    Difference,
    /// Sum of all metrics.
    Sum,
    /// Product of all metrics.
    Product,
    /// Arithmetic mean of all metrics.
    Mean,
}

impl ReducerName {
    /// Build the reducer. Variadic reducers take `metric_count` values.
    pub fn build(self, metric_count: usize) -> Reducer {
        match self {
            Self::Identity => Reducer::identity(),
            Self::Ratio => Reducer::binary("ratio", |a, b| a / b),
            Self::Difference => Reducer::binary("difference", |a, b| a - b),
            Self::Sum => Reducer::new("sum", metric_count, |values| values.iter().sum()),
            Self::Product => Reducer::new("product", metric_count, |values| {
                values.iter().product()
            }),
            Self::Mean => Reducer::new("mean", metric_count, |values| {
                values.iter().sum::<f64>() / values.len() as f64
            }),
        }
    }
}

/// Ordered metric identifiers plus the reducer that combines them.
#[derive(Debug, Clone)]
pub struct MetricQuery {
    metrics: Vec<String>,
    reducer: Option<Reducer>,
}

impl MetricQuery {
    /// Single metric, passed through unchanged.
    pub fn single(metric: impl Into<String>) -> Self {
        Self {
            metrics: vec![metric.into()],
            reducer: None,
        }
    }

    pub fn new(metrics: Vec<String>, reducer: Option<Reducer>) -> Self {
        Self { metrics, reducer }
    }

    pub fn with_reducer(metrics: Vec<String>, reducer: Reducer) -> Self {
        Self::new(metrics, Some(reducer))
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Check metric names and reducer arity.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.metrics.is_empty() {
            return Err(QueryError::NoMetrics);
        }
        if let Some(position) = self.metrics.iter().position(|m| m.trim().is_empty()) {
            return Err(QueryError::EmptyMetric { position });
        }
        match &self.reducer {
            None if self.metrics.len() > 1 => Err(QueryError::MissingReducer {
                metric_count: self.metrics.len(),
            }),
            Some(reducer) if reducer.arity() != self.metrics.len() => {
                Err(QueryError::ArityMismatch {
                    reducer: reducer.name().to_string(),
                    arity: reducer.arity(),
                    metric_count: self.metrics.len(),
                })
            }
            _ => Ok(()),
        }
    }

    /// The reducer to apply, defaulting to identity for a single metric.
    ///
    /// Validates the query first.
    pub fn resolved_reducer(&self) -> Result<Reducer, QueryError> {
        self.validate()?;
        Ok(self.reducer.clone().unwrap_or_else(Reducer::identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(metrics: &[&str]) -> Vec<String> {
        metrics.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn single_metric_defaults_to_identity() {
        let query = MetricQuery::single("simInsts");
        let reducer = query.resolved_reducer().expect("reducer");
        assert_eq!(reducer.name(), "identity");
        assert_eq!(reducer.apply(&[42.5]), 42.5);
    }

    #[test]
    fn multi_metric_requires_reducer() {
        let query = MetricQuery::new(names(&["a", "b"]), None);
        assert_eq!(
            query.validate(),
            Err(QueryError::MissingReducer { metric_count: 2 })
        );
    }

    #[test]
    fn rejects_arity_mismatch() {
        let query = MetricQuery::with_reducer(names(&["a", "b"]), Reducer::unary("half", |x| x / 2.0));
        assert_eq!(
            query.validate(),
            Err(QueryError::ArityMismatch {
                reducer: "half".to_string(),
                arity: 1,
                metric_count: 2,
            })
        );
    }

    #[test]
    fn rejects_empty_queries_and_names() {
        assert_eq!(
            MetricQuery::new(Vec::new(), None).validate(),
            Err(QueryError::NoMetrics)
        );
        assert_eq!(
            MetricQuery::with_reducer(names(&["a", " "]), Reducer::binary("r", |a, b| a / b))
                .validate(),
            Err(QueryError::EmptyMetric { position: 1 })
        );
    }

    #[test]
    fn binary_reducer_sees_values_in_query_order() {
        let query = MetricQuery::with_reducer(names(&["a", "b"]), Reducer::binary("ratio", |a, b| a / b));
        let reducer = query.resolved_reducer().expect("reducer");
        assert_eq!(reducer.apply(&[10.0, 2.0]), 5.0);
    }

    #[test]
    fn named_reducers_compute_expected_values() {
        assert_eq!(ReducerName::Ratio.build(2).apply(&[9.0, 3.0]), 3.0);
        assert_eq!(ReducerName::Difference.build(2).apply(&[9.0, 3.0]), 6.0);
        assert_eq!(ReducerName::Sum.build(3).apply(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(ReducerName::Product.build(3).apply(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(ReducerName::Mean.build(4).apply(&[1.0, 2.0, 3.0, 6.0]), 3.0);
        assert_eq!(ReducerName::Identity.build(1).apply(&[-7.0]), -7.0);
    }

    #[test]
    fn fixed_arity_named_reducers_ignore_metric_count() {
        let query = MetricQuery::with_reducer(names(&["a", "b", "c"]), ReducerName::Ratio.build(3));
        assert!(matches!(
            query.validate(),
            Err(QueryError::ArityMismatch { arity: 2, .. })
        ));
    }

    #[test]
    fn reducer_names_parse_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            reducer: ReducerName,
        }
        let parsed: Wrapper = toml::from_str("reducer = \"difference\"").expect("parse");
        assert_eq!(parsed.reducer, ReducerName::Difference);
    }
}
