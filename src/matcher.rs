//! Single-template evaluation: filter, score, threshold.

use crate::catalog::Template;
use crate::diagnostics::{DiagnosticsSink, MatchEvent, TracingSink};
use crate::filters::FilterChain;
use crate::question::QuestionProperties;
use crate::similarity::{NormalizedLevenshtein, SimilarityMetric, clamp_unit};
use serde::Serialize;
use std::sync::Arc;

/// Minimum similarity a template must reach to be considered a match.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Best-fitting example phrasing of an accepted template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub example: String,
    /// Always in `[threshold, 1.0]`.
    pub score: f64,
}

/// Evaluates one template against one question.
///
/// Holds no per-call state, so a single matcher can be shared across threads.
#[derive(Clone)]
pub struct TemplateMatcher {
    filters: Arc<FilterChain>,
    metric: Arc<dyn SimilarityMetric>,
    threshold: f64,
    sink: Arc<dyn DiagnosticsSink>,
}

impl TemplateMatcher {
    pub fn new(metric: Arc<dyn SimilarityMetric>) -> Self {
        Self {
            filters: Arc::new(FilterChain::standard()),
            metric,
            threshold: DEFAULT_THRESHOLD,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = Arc::new(filters);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub(crate) fn sink(&self) -> &dyn DiagnosticsSink {
        self.sink.as_ref()
    }

    /// Evaluate `template` for a question. `None` means rejected.
    pub fn evaluate(
        &self,
        properties: &QuestionProperties,
        template: &Template,
    ) -> Option<MatchResult> {
        self.evaluate_at(None, properties, template)
    }

    /// Same as [`evaluate`](Self::evaluate), tagging diagnostics with the
    /// template's catalog position.
    pub fn evaluate_at(
        &self,
        template_index: Option<usize>,
        properties: &QuestionProperties,
        template: &Template,
    ) -> Option<MatchResult> {
        if let Some((filter, reason)) = self.filters.first_rejection(properties, template) {
            self.sink.record(&MatchEvent::Filtered {
                template_index,
                filter,
                reason,
            });
            return None;
        }

        let (best_example, best_score) =
            best_example(self.metric.as_ref(), template, &properties.representation_form);

        match best_example {
            Some(example) if best_score >= self.threshold => {
                self.sink.record(&MatchEvent::Accepted {
                    template_index,
                    example: example.to_string(),
                    score: best_score,
                });
                Some(MatchResult {
                    example: example.to_string(),
                    score: best_score,
                })
            }
            _ => {
                self.sink.record(&MatchEvent::BelowThreshold {
                    template_index,
                    best_score,
                    threshold: self.threshold,
                });
                None
            }
        }
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(Arc::new(NormalizedLevenshtein))
    }
}

impl std::fmt::Debug for TemplateMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateMatcher")
            .field("filters", &self.filters)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

/// Highest-scoring example in catalog order; the first one wins ties.
///
/// `None` only when the template has no examples.
fn best_example<'t>(
    metric: &dyn SimilarityMetric,
    template: &'t Template,
    representation_form: &str,
) -> (Option<&'t str>, f64) {
    let mut max = 0.0;
    let mut best = None;
    for example in &template.examples {
        let similarity = clamp_unit(metric.score(example, representation_form));
        if best.is_none() || similarity > max {
            max = similarity;
            best = Some(example.as_str());
        }
    }
    (best, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use std::collections::HashMap;

    /// Metric returning fixed scores per example, 0 otherwise.
    fn table(scores: &[(&str, f64)]) -> Arc<dyn SimilarityMetric> {
        let map: HashMap<String, f64> = scores.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Arc::new(move |a: &str, _: &str| map.get(a).copied().unwrap_or(0.0))
    }

    fn template(start: &str, superlative: bool, examples: &[&str]) -> Template {
        Template {
            start_words: vec![start.to_string()],
            superlative,
            examples: examples.iter().map(|s| s.to_string()).collect(),
            query_bodies: vec!["SELECT ?x WHERE { $r0 ?p ?x }".to_string()],
            min_bound_entities: 0,
            min_ontology_refs: 0,
        }
    }

    fn question(start: &str, superlative: bool) -> QuestionProperties {
        QuestionProperties::new(start, superlative, "What is the capital of France")
    }

    #[test]
    fn test_rejects_wrong_start_word_regardless_of_score() {
        let matcher = TemplateMatcher::new(table(&[("a", 1.0)]));
        let t = template("Who", false, &["a"]);
        assert_eq!(matcher.evaluate(&question("What", false), &t), None);
    }

    #[test]
    fn test_rejects_superlative_template_for_plain_question() {
        let matcher = TemplateMatcher::new(table(&[("a", 0.99)]));
        let t = template("What", true, &["a"]);
        assert_eq!(matcher.evaluate(&question("What", false), &t), None);
        assert!(matcher.evaluate(&question("What", true), &t).is_some());
    }

    #[test]
    fn test_plain_template_accepts_superlative_question() {
        let matcher = TemplateMatcher::new(table(&[("a", 0.8)]));
        let t = template("What", false, &["a"]);
        assert!(matcher.evaluate(&question("What", true), &t).is_some());
    }

    #[test]
    fn test_returns_max_score_and_first_best_example() {
        let matcher = TemplateMatcher::new(table(&[("a", 0.6), ("b", 0.8), ("c", 0.8)]));
        let t = template("What", false, &["a", "b", "c"]);
        let result = matcher.evaluate(&question("What", false), &t).unwrap();
        assert_eq!(result.example, "b");
        assert_eq!(result.score, 0.8);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let matcher = TemplateMatcher::new(table(&[("a", 0.5)]));
        let t = template("What", false, &["a"]);
        let result = matcher.evaluate(&question("What", false), &t).unwrap();
        assert_eq!(result.score, 0.5);

        let matcher = TemplateMatcher::new(table(&[("a", 0.4999)]));
        assert_eq!(matcher.evaluate(&question("What", false), &t), None);
    }

    #[test]
    fn test_out_of_range_metric_is_clamped() {
        let matcher = TemplateMatcher::new(table(&[("a", 1.7)]));
        let t = template("What", false, &["a"]);
        assert_eq!(matcher.evaluate(&question("What", false), &t).unwrap().score, 1.0);
    }

    #[test]
    fn test_custom_threshold() {
        let matcher = TemplateMatcher::new(table(&[("a", 0.6)])).with_threshold(0.75);
        let t = template("What", false, &["a"]);
        assert_eq!(matcher.evaluate(&question("What", false), &t), None);
    }

    #[test]
    fn test_zero_threshold_accepts_zero_scores() {
        let matcher = TemplateMatcher::new(table(&[])).with_threshold(0.0);
        let t = template("What", false, &["a", "b"]);
        let result = matcher.evaluate(&question("What", false), &t).unwrap();
        assert_eq!(result.example, "a");
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_template_without_examples_is_rejected() {
        let matcher = TemplateMatcher::new(table(&[])).with_threshold(0.0);
        let t = template("What", false, &[]);
        assert_eq!(matcher.evaluate(&question("What", false), &t), None);
    }

    #[test]
    fn test_diagnostics_are_reported_to_sink() {
        let sink = Arc::new(CollectingSink::new());
        let matcher = TemplateMatcher::new(table(&[("a", 0.9), ("low", 0.1)]))
            .with_sink(sink.clone());

        matcher.evaluate_at(Some(0), &question("Who", false), &template("What", false, &["a"]));
        matcher.evaluate_at(Some(1), &question("What", false), &template("What", false, &["low"]));
        matcher.evaluate_at(Some(2), &question("What", false), &template("What", false, &["a"]));

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            MatchEvent::Filtered {
                template_index: Some(0),
                filter: "start_word",
                ..
            }
        ));
        assert!(matches!(
            events[1],
            MatchEvent::BelowThreshold {
                template_index: Some(1),
                ..
            }
        ));
        assert!(matches!(
            events[2],
            MatchEvent::Accepted {
                template_index: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_default_matcher_uses_levenshtein() {
        let matcher = TemplateMatcher::default();
        let t = template("What", false, &["What is the capital of X", "Who is X"]);
        let result = matcher.evaluate(&question("What", false), &t).unwrap();
        assert_eq!(result.example, "What is the capital of X");
        assert!(result.score > 0.7);
    }
}
