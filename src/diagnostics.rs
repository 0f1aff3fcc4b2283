//! Diagnostic events emitted while matching.
//!
//! The matcher and the aggregator never log directly; they report
//! [`MatchEvent`]s to an injected [`DiagnosticsSink`]. [`TracingSink`] is the
//! default and forwards to `tracing`; [`CollectingSink`] keeps the records so
//! callers and tests can inspect them.

use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchEvent {
    QuestionAnalyzed {
        start_word: String,
        has_superlative: bool,
        representation_form: String,
    },
    /// A categorical filter rejected the template.
    Filtered {
        template_index: Option<usize>,
        filter: &'static str,
        reason: String,
    },
    BelowThreshold {
        template_index: Option<usize>,
        best_score: f64,
        threshold: f64,
    },
    Accepted {
        template_index: Option<usize>,
        example: String,
        score: f64,
    },
    /// Accepted by scoring but produced no bound query.
    NoBindings { template_index: usize },
    Ranked {
        templates: usize,
        accepted: usize,
        ranked: usize,
    },
}

pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: &MatchEvent);
}

/// Forwards events to `tracing` at debug/info/warn levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, event: &MatchEvent) {
        match event {
            MatchEvent::QuestionAnalyzed {
                start_word,
                has_superlative,
                representation_form,
            } => tracing::info!(
                "Question properties: start='{}' superlative={} repr='{}'",
                start_word,
                has_superlative,
                representation_form
            ),
            MatchEvent::Filtered {
                template_index,
                filter,
                reason,
            } => tracing::debug!(
                template = ?template_index,
                filter = %filter,
                "Template filtered: {}",
                reason
            ),
            MatchEvent::BelowThreshold {
                template_index,
                best_score,
                threshold,
            } => tracing::warn!(
                template = ?template_index,
                "Similarity too low: maximum is only {:.4} (threshold {})",
                best_score,
                threshold
            ),
            MatchEvent::Accepted {
                template_index,
                example,
                score,
            } => tracing::info!(template = ?template_index, "{}: {:.4}", example, score),
            MatchEvent::NoBindings { template_index } => tracing::debug!(
                template = template_index,
                "Template accepted but no parameters could be bound"
            ),
            MatchEvent::Ranked {
                templates,
                accepted,
                ranked,
            } => tracing::debug!(
                "Ranked {} of {} templates ({} accepted)",
                ranked,
                templates,
                accepted
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn record(&self, _event: &MatchEvent) {}
}

/// Keeps every recorded event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<MatchEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MatchEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<MatchEvent> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl DiagnosticsSink for CollectingSink {
    fn record(&self, event: &MatchEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_records_and_drains() {
        let sink = CollectingSink::new();
        sink.record(&MatchEvent::NoBindings { template_index: 4 });
        sink.record(&MatchEvent::Ranked {
            templates: 5,
            accepted: 1,
            ranked: 0,
        });
        assert_eq!(sink.events().len(), 2);
        let drained = sink.take();
        assert_eq!(drained[0], MatchEvent::NoBindings { template_index: 4 });
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let value = serde_json::to_value(MatchEvent::BelowThreshold {
            template_index: Some(2),
            best_score: 0.25,
            threshold: 0.5,
        })
        .unwrap();
        assert_eq!(value["event"], "below_threshold");
        assert_eq!(value["template_index"], 2);
    }
}
