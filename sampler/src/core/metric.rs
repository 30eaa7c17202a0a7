//! Locating labelled numeric values in simulator result text.
//!
//! A metric is found at the first place its identifier is immediately
//! followed by whitespace and a token starting with an optionally signed
//! digit. The whole token up to the next whitespace is the value: `1000`,
//! `-4.5` and `1.5e3` parse, while `12abc` or `1,000` are malformed rather
//! than silently cut short. Occurrences followed by words (`a counts`) are
//! skipped. The identifier may sit inside a longer label (`simInsts` also
//! matches the tail of `system.simInsts`); nothing else about the file
//! format is interpreted.

use std::path::Path;

use regex::Regex;

use crate::core::errors::ExtractError;

const NUMERAL: &str = r"\s+([+-]?\d\S*)";

/// A compiled search for one metric identifier.
#[derive(Debug, Clone)]
pub struct MetricPattern {
    metric: String,
    regex: Regex,
}

impl MetricPattern {
    pub fn new(metric: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("{}{NUMERAL}", regex::escape(metric)))?;
        Ok(Self {
            metric: metric.to_string(),
            regex,
        })
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// The raw numeral following the first match, if any.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }
}

pub fn compile_patterns(metrics: &[String]) -> Result<Vec<MetricPattern>, regex::Error> {
    metrics.iter().map(|m| MetricPattern::new(m)).collect()
}

/// Values for every pattern, in pattern order.
///
/// `path` only labels errors; the first missing or malformed metric stops
/// the scan.
pub fn read_metrics(
    path: &Path,
    text: &str,
    patterns: &[MetricPattern],
) -> Result<Vec<f64>, ExtractError> {
    patterns
        .iter()
        .map(|pattern| {
            let raw = pattern
                .find(text)
                .ok_or_else(|| ExtractError::MetricNotFound {
                    path: path.to_path_buf(),
                    metric: pattern.metric().to_string(),
                })?;
            raw.parse::<f64>()
                .map_err(|_| ExtractError::MalformedValue {
                    path: path.to_path_buf(),
                    metric: pattern.metric().to_string(),
                    value: raw.to_string(),
                })
        })
        .collect()
}
