//! Catalog-wide matching and deterministic ranking of accepted templates.

use crate::catalog::{Catalog, CatalogSource, SharedCatalog};
use crate::config::MatchingConfig;
use crate::diagnostics::{DiagnosticsSink, MatchEvent};
use crate::error::CatalogError;
use crate::filters::FilterChain;
use crate::matcher::TemplateMatcher;
use crate::question::{QuestionAnalyzer, QuestionProperties, Token, TokenAnalyzer};
use crate::substitution::{BoundQuery, ParameterSubstitutor, PlaceholderSubstitutor};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

/// Per-template offset added to the raw score to build the ranking key.
pub const DEFAULT_TIE_BREAK_STEP: f64 = 0.001;

/// How accepted templates are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    /// Raw score first, catalog position second. Immune to offset drift.
    #[default]
    ScoreThenPosition,
    /// Order by `score + offset`, reproducing the historic float-keyed ranking.
    LegacyOffset,
}

impl RankingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingStrategy::ScoreThenPosition => "score_then_position",
            RankingStrategy::LegacyOffset => "legacy_offset",
        }
    }

    /// Best-first comparison.
    fn compare(&self, a: &RankKey, b: &RankKey) -> Ordering {
        let primary = match self {
            RankingStrategy::ScoreThenPosition => b.score.total_cmp(&a.score),
            RankingStrategy::LegacyOffset => b.value.total_cmp(&a.value),
        };
        // Later templates carry the larger offset, so they win exact ties.
        primary.then_with(|| b.position.cmp(&a.position))
    }
}

impl FromStr for RankingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "score_then_position" | "stable" => Ok(RankingStrategy::ScoreThenPosition),
            "legacy_offset" | "legacy" => Ok(RankingStrategy::LegacyOffset),
            other => Err(format!("unknown ranking strategy '{}'", other)),
        }
    }
}

/// Unique ranking key of an accepted template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankKey {
    /// Raw similarity of the best example.
    pub score: f64,
    /// Zero-based catalog position.
    pub position: usize,
    /// `score` plus the accumulated tie-break offset.
    ///
    /// Result order follows `value` only under
    /// [`RankingStrategy::LegacyOffset`]. Under the default strategy the order
    /// comes from `(score, position)` and `value` is informational.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub key: RankKey,
    pub example: String,
    pub candidates: Vec<BoundQuery>,
}

/// Accepted templates with their bound queries, best first.
///
/// Never holds an entry with an empty candidate list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedCandidates {
    entries: Vec<RankedEntry>,
}

impl RankedCandidates {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<&RankedEntry> {
        self.entries.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedEntry> {
        self.entries.iter()
    }

    /// Ranking key values in result order.
    ///
    /// Descending only under [`RankingStrategy::LegacyOffset`]; with
    /// [`RankingStrategy::ScoreThenPosition`] a near-tie can put a smaller
    /// value first.
    pub fn keys(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.key.value).collect()
    }

    /// Entry for the template at `position`, if it was ranked.
    pub fn for_position(&self, position: usize) -> Option<&RankedEntry> {
        self.entries.iter().find(|e| e.key.position == position)
    }

    /// All bound queries, best template first.
    pub fn queries(&self) -> impl Iterator<Item = &BoundQuery> {
        self.entries.iter().flat_map(|e| e.candidates.iter())
    }

    pub fn into_entries(self) -> Vec<RankedEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a RankedCandidates {
    type Item = &'a RankedEntry;
    type IntoIter = std::slice::Iter<'a, RankedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Runs the template matcher over a whole catalog and ranks the survivors.
///
/// Stateless per call; the catalog sits behind a [`SharedCatalog`] so it can
/// be reloaded while other threads are matching.
pub struct RankingAggregator {
    catalog: SharedCatalog,
    analyzer: Arc<dyn QuestionAnalyzer>,
    matcher: TemplateMatcher,
    substitutor: Arc<dyn ParameterSubstitutor>,
    tie_break_step: f64,
    strategy: RankingStrategy,
}

impl RankingAggregator {
    /// Aggregator with the default analyzer, matcher and substitutor.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: SharedCatalog::new(catalog),
            analyzer: Arc::new(TokenAnalyzer::new()),
            matcher: TemplateMatcher::default(),
            substitutor: Arc::new(PlaceholderSubstitutor::default()),
            tie_break_step: DEFAULT_TIE_BREAK_STEP,
            strategy: RankingStrategy::default(),
        }
    }

    pub fn from_config(config: &MatchingConfig, catalog: Catalog) -> Self {
        let filters = if config.enforce_entity_counts {
            FilterChain::with_entity_counts()
        } else {
            FilterChain::standard()
        };
        let matcher = TemplateMatcher::new(config.metric.build(config.case_insensitive))
            .with_threshold(config.threshold)
            .with_filters(filters);
        Self::new(catalog)
            .with_matcher(matcher)
            .with_substitutor(Arc::new(PlaceholderSubstitutor::new(
                config.max_bindings_per_template,
            )))
            .with_tie_break_step(config.tie_break_step)
            .with_strategy(config.ranking)
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn QuestionAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_matcher(mut self, matcher: TemplateMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_substitutor(mut self, substitutor: Arc<dyn ParameterSubstitutor>) -> Self {
        self.substitutor = substitutor;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.matcher = self.matcher.with_sink(sink);
        self
    }

    pub fn with_tie_break_step(mut self, step: f64) -> Self {
        self.tie_break_step = step;
        self
    }

    pub fn with_strategy(mut self, strategy: RankingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    pub fn strategy(&self) -> RankingStrategy {
        self.strategy
    }

    /// Snapshot of the current catalog.
    pub fn catalog(&self) -> Catalog {
        self.catalog.snapshot()
    }

    pub fn replace_catalog(&self, catalog: Catalog) -> Catalog {
        self.catalog.replace(catalog)
    }

    pub fn reload_catalog(&self, source: &dyn CatalogSource) -> Result<usize, CatalogError> {
        self.catalog.reload(source)
    }

    /// Match a question against the current catalog.
    pub fn match_question(&self, tokens: &[Token]) -> RankedCandidates {
        let properties = self.analyzer.analyze(tokens);
        self.match_properties(tokens, &properties)
    }

    /// Match with properties the caller already derived from `tokens`.
    pub fn match_properties(
        &self,
        tokens: &[Token],
        properties: &QuestionProperties,
    ) -> RankedCandidates {
        let catalog = self.catalog.snapshot();
        let sink = self.matcher.sink();
        sink.record(&MatchEvent::QuestionAnalyzed {
            start_word: properties.start_word.clone(),
            has_superlative: properties.has_superlative,
            representation_form: properties.representation_form.clone(),
        });

        let mut offset = 0.0;
        let mut accepted = 0;
        let mut entries = Vec::new();
        for (position, template) in catalog.iter().enumerate() {
            // Advances for every template so the key encodes catalog position.
            offset += self.tie_break_step;

            let Some(result) = self.matcher.evaluate_at(Some(position), properties, template)
            else {
                continue;
            };
            accepted += 1;

            let candidates = self.substitutor.bind(tokens, &result.example, template);
            if candidates.is_empty() {
                sink.record(&MatchEvent::NoBindings {
                    template_index: position,
                });
                continue;
            }

            entries.push(RankedEntry {
                key: RankKey {
                    score: result.score,
                    position,
                    value: result.score + offset,
                },
                example: result.example,
                candidates,
            });
        }

        entries.sort_by(|a, b| self.strategy.compare(&a.key, &b.key));
        sink.record(&MatchEvent::Ranked {
            templates: catalog.len(),
            accepted,
            ranked: entries.len(),
        });
        RankedCandidates { entries }
    }
}

impl std::fmt::Debug for RankingAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingAggregator")
            .field("templates", &self.catalog.snapshot().len())
            .field("matcher", &self.matcher)
            .field("tie_break_step", &self.tie_break_step)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
