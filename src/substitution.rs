//! Binding question entities into template query bodies.

use crate::catalog::Template;
use crate::question::Token;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// A query body with every placeholder resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundQuery {
    pub query: String,
    /// Placeholder (`$r0`, `$o1`, ...) to the IRI it was bound to.
    pub bindings: BTreeMap<String, String>,
}

/// Produces executable queries for an accepted template.
///
/// "No valid binding" is an empty list, never a panic.
pub trait ParameterSubstitutor: Send + Sync {
    fn bind(&self, tokens: &[Token], example: &str, template: &Template) -> Vec<BoundQuery>;
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([ro])(\d+)").expect("placeholder pattern is valid"));

pub const DEFAULT_MAX_BINDINGS: usize = 16;

/// Fills `$rN` with the N-th linked resource and `$oN` with the N-th linked
/// ontology term of the question.
///
/// When the question carries more entities than a body uses, every ordered
/// selection is emitted (lexicographic over question order) up to
/// `max_bindings` queries per template.
#[derive(Debug, Clone)]
pub struct PlaceholderSubstitutor {
    max_bindings: usize,
}

impl PlaceholderSubstitutor {
    pub fn new(max_bindings: usize) -> Self {
        Self { max_bindings }
    }
}

impl Default for PlaceholderSubstitutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BINDINGS)
    }
}

impl ParameterSubstitutor for PlaceholderSubstitutor {
    fn bind(&self, tokens: &[Token], _example: &str, template: &Template) -> Vec<BoundQuery> {
        let resources = distinct(tokens.iter().filter_map(|t| t.resource.as_deref()));
        let ontologies = distinct(tokens.iter().filter_map(|t| t.ontology.as_deref()));

        let mut out = Vec::new();
        for body in &template.query_bodies {
            let (need_r, need_o) = placeholder_arity(body);
            if need_r > resources.len() || need_o > ontologies.len() {
                continue;
            }
            let budget = self.max_bindings.saturating_sub(out.len());
            if budget == 0 {
                break;
            }
            // Every resource selection pairs with at least one ontology
            // selection, so neither side needs more than the remaining budget.
            let o_sels = selections(ontologies.len(), need_o, budget);
            for r_sel in selections(resources.len(), need_r, budget) {
                for o_sel in &o_sels {
                    if out.len() >= self.max_bindings {
                        return out;
                    }
                    out.push(fill(body, &resources, &r_sel, &ontologies, o_sel));
                }
            }
        }
        out
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen
}

/// Number of resource and ontology slots a body needs (highest index + 1).
fn placeholder_arity(body: &str) -> (usize, usize) {
    let mut r = 0;
    let mut o = 0;
    for caps in PLACEHOLDER.captures_iter(body) {
        let Ok(idx) = caps[2].parse::<usize>() else {
            continue;
        };
        match &caps[1] {
            "r" => r = r.max(idx + 1),
            _ => o = o.max(idx + 1),
        }
    }
    (r, o)
}

/// The first `limit` ordered selections of `k` distinct indices out of `n`,
/// lexicographic. Enumeration stops as soon as `limit` is reached.
fn selections(n: usize, k: usize, limit: usize) -> Vec<Vec<usize>> {
    fn rec(
        n: usize,
        k: usize,
        limit: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in 0..n {
            if out.len() >= limit {
                return;
            }
            if !current.contains(&i) {
                current.push(i);
                rec(n, k, limit, current, out);
                current.pop();
            }
        }
    }
    let mut out = Vec::new();
    if k <= n && limit > 0 {
        rec(n, k, limit, &mut Vec::with_capacity(k), &mut out);
    }
    out
}

fn as_iri(value: &str) -> String {
    if value.starts_with('<') && value.ends_with('>') {
        value.to_string()
    } else {
        format!("<{}>", value)
    }
}

fn fill(
    body: &str,
    resources: &[&str],
    r_sel: &[usize],
    ontologies: &[&str],
    o_sel: &[usize],
) -> BoundQuery {
    let mut bindings = BTreeMap::new();
    let query = PLACEHOLDER
        .replace_all(body, |caps: &regex::Captures| {
            let placeholder = caps[0].to_string();
            let value = caps[2].parse::<usize>().ok().and_then(|idx| match &caps[1] {
                "r" => r_sel.get(idx).map(|&i| resources[i]),
                _ => o_sel.get(idx).map(|&i| ontologies[i]),
            });
            match value {
                Some(v) => {
                    bindings.insert(placeholder, v.to_string());
                    as_iri(v)
                }
                None => placeholder,
            }
        })
        .into_owned();
    BoundQuery { query, bindings }
}
