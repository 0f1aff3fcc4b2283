//! Categorical pre-filters applied before fuzzy scoring.

use crate::catalog::Template;
use crate::question::QuestionProperties;

/// Result of one filter stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Pass,
    Reject(String),
}

impl FilterOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, FilterOutcome::Pass)
    }
}

/// A hard gate deciding whether a template may apply to a question at all.
pub trait TemplateFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, properties: &QuestionProperties, template: &Template) -> FilterOutcome;
}

/// Question start word must be listed by the template (exact, case-sensitive).
#[derive(Debug, Clone, Copy, Default)]
pub struct StartWordFilter;

impl TemplateFilter for StartWordFilter {
    fn name(&self) -> &'static str {
        "start_word"
    }

    fn check(&self, properties: &QuestionProperties, template: &Template) -> FilterOutcome {
        if template.accepts_start_word(&properties.start_word) {
            FilterOutcome::Pass
        } else {
            FilterOutcome::Reject(format!("Wrong question word '{}'", properties.start_word))
        }
    }
}

/// Superlative templates need a superlative question. The reverse is allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuperlativeFilter;

impl TemplateFilter for SuperlativeFilter {
    fn name(&self) -> &'static str {
        "superlative"
    }

    fn check(&self, properties: &QuestionProperties, template: &Template) -> FilterOutcome {
        if template.superlative && !properties.has_superlative {
            FilterOutcome::Reject("Inconsistent superlative".to_string())
        } else {
            FilterOutcome::Pass
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinBoundEntitiesFilter;

impl TemplateFilter for MinBoundEntitiesFilter {
    fn name(&self) -> &'static str {
        "min_bound_entities"
    }

    fn check(&self, properties: &QuestionProperties, template: &Template) -> FilterOutcome {
        if template.min_bound_entities > properties.resource_count {
            FilterOutcome::Reject(format!(
                "Not enough resources: need {}, question has {}",
                template.min_bound_entities, properties.resource_count
            ))
        } else {
            FilterOutcome::Pass
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinOntologyRefsFilter;

impl TemplateFilter for MinOntologyRefsFilter {
    fn name(&self) -> &'static str {
        "min_ontology_refs"
    }

    fn check(&self, properties: &QuestionProperties, template: &Template) -> FilterOutcome {
        if template.min_ontology_refs > properties.ontology_count {
            FilterOutcome::Reject(format!(
                "Not enough ontology references: need {}, question has {}",
                template.min_ontology_refs, properties.ontology_count
            ))
        } else {
            FilterOutcome::Pass
        }
    }
}

/// Ordered filter chain; the first rejection wins.
pub struct FilterChain {
    filters: Vec<Box<dyn TemplateFilter>>,
}

impl FilterChain {
    pub fn empty() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Start word then superlative.
    pub fn standard() -> Self {
        Self::empty()
            .with(StartWordFilter)
            .with(SuperlativeFilter)
    }

    /// Standard chain plus the entity-count hints.
    pub fn with_entity_counts() -> Self {
        Self::standard()
            .with(MinBoundEntitiesFilter)
            .with(MinOntologyRefsFilter)
    }

    pub fn with(mut self, filter: impl TemplateFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Returns the name and reason of the first failing filter.
    pub fn first_rejection(
        &self,
        properties: &QuestionProperties,
        template: &Template,
    ) -> Option<(&'static str, String)> {
        self.filters
            .iter()
            .find_map(|f| match f.check(properties, template) {
                FilterOutcome::Pass => None,
                FilterOutcome::Reject(reason) => Some((f.name(), reason)),
            })
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
