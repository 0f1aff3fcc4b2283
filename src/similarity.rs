//! String similarity metrics used to compare example phrasings with questions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Pure, deterministic similarity in `[0, 1]`.
///
/// Need not be symmetric; the matcher always calls
/// `score(example, representation_form)`.
pub trait SimilarityMetric: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

impl<F> SimilarityMetric for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn score(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Levenshtein distance normalized by the longer string.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl SimilarityMetric for NormalizedLevenshtein {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl SimilarityMetric for JaroWinkler {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b)
    }
}

/// Bigram overlap (Sørensen–Dice coefficient).
#[derive(Debug, Clone, Copy, Default)]
pub struct SorensenDice;

impl SimilarityMetric for SorensenDice {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::sorensen_dice(a, b)
    }
}

/// Wraps a metric, lowercasing both sides first and clamping the result.
pub struct CaseFolded<M> {
    inner: M,
}

impl<M: SimilarityMetric> CaseFolded<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M: SimilarityMetric> SimilarityMetric for CaseFolded<M> {
    fn score(&self, a: &str, b: &str) -> f64 {
        clamp_unit(self.inner.score(&a.to_lowercase(), &b.to_lowercase()))
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Config-selectable built-in metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Levenshtein,
    JaroWinkler,
    SorensenDice,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Levenshtein => "levenshtein",
            MetricKind::JaroWinkler => "jaro_winkler",
            MetricKind::SorensenDice => "sorensen_dice",
        }
    }

    /// Instantiate the metric, optionally case-folding inputs.
    pub fn build(self, case_insensitive: bool) -> Arc<dyn SimilarityMetric> {
        match (self, case_insensitive) {
            (MetricKind::Levenshtein, false) => Arc::new(NormalizedLevenshtein),
            (MetricKind::Levenshtein, true) => Arc::new(CaseFolded::new(NormalizedLevenshtein)),
            (MetricKind::JaroWinkler, false) => Arc::new(JaroWinkler),
            (MetricKind::JaroWinkler, true) => Arc::new(CaseFolded::new(JaroWinkler)),
            (MetricKind::SorensenDice, false) => Arc::new(SorensenDice),
            (MetricKind::SorensenDice, true) => Arc::new(CaseFolded::new(SorensenDice)),
        }
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "levenshtein" | "normalized_levenshtein" => Ok(MetricKind::Levenshtein),
            "jaro_winkler" | "jarowinkler" => Ok(MetricKind::JaroWinkler),
            "sorensen_dice" | "dice" => Ok(MetricKind::SorensenDice),
            other => Err(format!("unknown similarity metric '{}'", other)),
        }
    }
}
