pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filters;
pub mod matcher;
pub mod question;
pub mod ranking;
pub mod similarity;
pub mod substitution;

pub use catalog::{Catalog, CatalogSource, FileSource, SharedCatalog, StaticSource, Template};
pub use error::{CatalogError, Result, TemplateMatchError};
pub use matcher::{MatchResult, TemplateMatcher};
pub use question::{QuestionAnalyzer, QuestionProperties, Token, TokenAnalyzer};
pub use ranking::{RankKey, RankedCandidates, RankedEntry, RankingAggregator, RankingStrategy};
pub use substitution::{BoundQuery, ParameterSubstitutor, PlaceholderSubstitutor};

use config::Config;

// Load env from a simple, standardized location resolution.
// This uses dotenvy::dotenv().ok() which loads .env if present and silently ignores if missing.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

/// Load the configured catalog and build an aggregator around it.
///
/// With `catalog.strict` unset a missing or broken catalog degrades to an
/// empty one (logged); otherwise the load error is returned.
pub fn build_aggregator(config: &Config) -> Result<RankingAggregator> {
    let source = FileSource::new(&config.catalog.path);
    let catalog = if config.catalog.strict {
        source.load()?
    } else {
        catalog::load_or_empty(&source).0
    };
    tracing::debug!(
        "Building aggregator: {} templates, metric={}, ranking={}",
        catalog.len(),
        config.matching.metric.as_str(),
        config.matching.ranking.as_str()
    );
    Ok(RankingAggregator::from_config(&config.matching, catalog))
}
