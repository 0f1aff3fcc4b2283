//! Property-based tests for template evaluation and ranking.
//!
//! Similarity is driven by a lookup table keyed on the example phrasing so the
//! expected outcome of every template can be computed independently.

use proptest::prelude::*;
use question_templates::similarity::SimilarityMetric;
use question_templates::{
    Catalog, QuestionProperties, RankingAggregator, RankingStrategy, Template, TemplateMatcher,
    Token,
};
use std::collections::HashMap;
use std::sync::Arc;

const START_WORDS: &[&str] = &["What", "Who", "Which"];

/// Scores on a 0.05 grid so distinct real keys never collide in floating point.
fn score_strategy() -> impl Strategy<Value = f64> {
    (0u32..=20).prop_map(|n| n as f64 * 0.05)
}

#[derive(Debug, Clone)]
struct Case {
    templates: Vec<Template>,
    scores: HashMap<String, f64>,
    start_word: String,
    superlative: bool,
}

fn case_strategy() -> impl Strategy<Value = Case> {
    let template = (
        prop::sample::subsequence(START_WORDS.to_vec(), 1..=3),
        any::<bool>(),
        prop::collection::vec(score_strategy(), 1..4),
    );
    (
        prop::collection::vec(template, 0..12),
        prop::sample::select(START_WORDS.to_vec()),
        any::<bool>(),
    )
        .prop_map(|(raw, start_word, superlative)| {
            let mut scores = HashMap::new();
            let templates = raw
                .into_iter()
                .enumerate()
                .map(|(t, (starts, needs_superlative, example_scores))| {
                    let examples = example_scores
                        .into_iter()
                        .enumerate()
                        .map(|(e, score)| {
                            let example = format!("template {t} example {e}");
                            scores.insert(example.clone(), score);
                            example
                        })
                        .collect();
                    Template {
                        start_words: starts.into_iter().map(String::from).collect(),
                        superlative: needs_superlative,
                        examples,
                        query_bodies: vec!["ASK { ?s ?p ?o }".to_string()],
                        min_bound_entities: 0,
                        min_ontology_refs: 0,
                    }
                })
                .collect();
            Case {
                templates,
                scores,
                start_word: start_word.to_string(),
                superlative,
            }
        })
}

fn metric(scores: &HashMap<String, f64>) -> Arc<dyn SimilarityMetric> {
    let scores = scores.clone();
    Arc::new(move |a: &str, _: &str| scores.get(a).copied().unwrap_or(0.0))
}

fn properties(case: &Case) -> QuestionProperties {
    QuestionProperties::new(case.start_word.clone(), case.superlative, "question")
}

/// Independent statement of when a template should be accepted.
fn expected(case: &Case, template: &Template) -> Option<(String, f64)> {
    if !template.start_words.contains(&case.start_word) {
        return None;
    }
    if template.superlative && !case.superlative {
        return None;
    }
    let max = template
        .examples
        .iter()
        .map(|e| case.scores[e])
        .fold(0.0, f64::max);
    if max < 0.5 {
        return None;
    }
    let first = template.examples.iter().find(|e| case.scores[*e] == max)?;
    Some((first.clone(), max))
}

fn aggregator(case: &Case, strategy: RankingStrategy) -> RankingAggregator {
    RankingAggregator::new(Catalog::new(case.templates.clone()).unwrap())
        .with_matcher(TemplateMatcher::new(metric(&case.scores)))
        .with_strategy(strategy)
}

proptest! {
    #[test]
    fn prop_evaluate_matches_independent_model(case in case_strategy()) {
        let matcher = TemplateMatcher::new(metric(&case.scores));
        let props = properties(&case);
        for template in &case.templates {
            let got = matcher.evaluate(&props, template).map(|r| (r.example, r.score));
            prop_assert_eq!(got, expected(&case, template));
        }
    }

    #[test]
    fn prop_ranked_keys_are_bounded_unique_and_ordered(case in case_strategy()) {
        let n = case.templates.len();
        let agg = aggregator(&case, RankingStrategy::ScoreThenPosition);
        let ranked = agg.match_properties(&[Token::new(case.start_word.clone())], &properties(&case));

        prop_assert!(ranked.len() <= n);
        let upper = 1.0 + 0.001 * n as f64 + 1e-9;
        for entry in &ranked {
            prop_assert!(entry.key.value >= 0.5 && entry.key.value <= upper);
            prop_assert!(entry.key.score >= 0.5 && entry.key.score <= 1.0);
            prop_assert!(!entry.candidates.is_empty());
        }

        let keys = ranked.keys();
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                prop_assert_ne!(keys[i], keys[j]);
            }
        }

        let entries: Vec<_> = ranked.iter().collect();
        for pair in entries.windows(2) {
            let (a, b) = (&pair[0].key, &pair[1].key);
            prop_assert!(a.score > b.score || (a.score == b.score && a.position > b.position));
        }
    }

    #[test]
    fn prop_ranked_set_is_exactly_the_accepted_templates(case in case_strategy()) {
        let agg = aggregator(&case, RankingStrategy::ScoreThenPosition);
        let ranked = agg.match_properties(&[], &properties(&case));
        for (position, template) in case.templates.iter().enumerate() {
            let entry = ranked.for_position(position);
            match expected(&case, template) {
                Some((example, score)) => {
                    let entry = entry.expect("accepted template must be ranked");
                    prop_assert_eq!(&entry.example, &example);
                    prop_assert_eq!(entry.key.score, score);
                }
                None => {
                    prop_assert!(entry.is_none());
                }
            }
        }
    }

    #[test]
    fn prop_legacy_strategy_orders_by_key(case in case_strategy()) {
        let agg = aggregator(&case, RankingStrategy::LegacyOffset);
        let keys = agg.match_properties(&[], &properties(&case)).keys();
        prop_assert!(keys.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn prop_matching_is_deterministic(case in case_strategy()) {
        let agg = aggregator(&case, RankingStrategy::ScoreThenPosition);
        let props = properties(&case);
        let first = agg.match_properties(&[], &props);
        let second = agg.match_properties(&[], &props);
        prop_assert_eq!(first.keys().iter().map(|k| k.to_bits()).collect::<Vec<_>>(),
                        second.keys().iter().map(|k| k.to_bits()).collect::<Vec<_>>());
        prop_assert_eq!(first, second);
    }
}
