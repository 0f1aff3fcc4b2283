//! Question tokens and the properties derived from them.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// One analyzed token of a question, as produced by the upstream
/// linguistic pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Token {
    pub text: String,
    #[serde(default)]
    pub lemma: Option<String>,
    /// Penn Treebank tag, e.g. `JJS` for superlative adjectives.
    #[serde(default)]
    pub pos: Option<String>,
    /// Knowledge-base resource linked to this token.
    #[serde(default)]
    pub resource: Option<String>,
    /// Ontology class or property linked to this token.
    #[serde(default)]
    pub ontology: Option<String>,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = Some(pos.into());
        self
    }

    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    pub fn with_resource(mut self, iri: impl Into<String>) -> Self {
        self.resource = Some(iri.into());
        self
    }

    pub fn with_ontology(mut self, iri: impl Into<String>) -> Self {
        self.ontology = Some(iri.into());
        self
    }

    /// Whitespace tokenization with trailing punctuation stripped.
    /// Carries no linguistic annotations.
    pub fn from_plain_text(text: &str) -> Vec<Token> {
        text.split_whitespace()
            .map(|w| w.trim_end_matches(['?', '!', '.', ',']))
            .filter(|w| !w.is_empty())
            .map(Token::new)
            .collect()
    }
}

/// Properties of a question relevant to template matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionProperties {
    pub start_word: String,
    pub has_superlative: bool,
    pub representation_form: String,
    pub resource_count: usize,
    pub ontology_count: usize,
}

impl QuestionProperties {
    pub fn new(
        start_word: impl Into<String>,
        has_superlative: bool,
        representation_form: impl Into<String>,
    ) -> Self {
        Self {
            start_word: start_word.into(),
            has_superlative,
            representation_form: representation_form.into(),
            resource_count: 0,
            ontology_count: 0,
        }
    }
}

/// Derives [`QuestionProperties`] from analyzed tokens.
///
/// Implementations must be pure and total over well-formed token sequences.
pub trait QuestionAnalyzer: Send + Sync {
    fn analyze(&self, tokens: &[Token]) -> QuestionProperties;
}

/// Two-word openers that act as a single start word.
const COMPOUND_OPENERS: &[(&str, &str)] = &[
    ("How", "many"),
    ("How", "much"),
    ("How", "often"),
    ("How", "long"),
    ("How", "old"),
    ("How", "tall"),
    ("How", "big"),
    ("In", "which"),
    ("In", "what"),
    ("To", "which"),
    ("For", "which"),
];

static SUPERLATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "most", "least", "best", "worst", "largest", "smallest", "highest", "lowest", "biggest",
        "oldest", "youngest", "longest", "shortest", "first", "last",
    ]
    .into_iter()
    .collect()
});

/// Default analyzer working from POS tags, lemmas and entity links.
#[derive(Debug, Clone, Default)]
pub struct TokenAnalyzer;

impl TokenAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn start_word(tokens: &[Token]) -> String {
        match tokens {
            [] => String::new(),
            [first, second, ..] => COMPOUND_OPENERS
                .iter()
                .find(|(a, b)| first.text == *a && second.text.eq_ignore_ascii_case(b))
                .map(|(a, b)| format!("{} {}", a, b))
                .unwrap_or_else(|| first.text.clone()),
            [first, ..] => first.text.clone(),
        }
    }

    fn is_superlative(token: &Token) -> bool {
        if matches!(token.pos.as_deref(), Some("JJS") | Some("RBS")) {
            return true;
        }
        let word = token.lemma.as_deref().unwrap_or(&token.text).to_lowercase();
        SUPERLATIVE_WORDS.contains(word.as_str())
    }
}

impl QuestionAnalyzer for TokenAnalyzer {
    fn analyze(&self, tokens: &[Token]) -> QuestionProperties {
        let representation_form = tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .nfkc()
            .collect::<String>();

        QuestionProperties {
            start_word: Self::start_word(tokens),
            has_superlative: tokens.iter().any(Self::is_superlative),
            representation_form,
            resource_count: tokens.iter().filter(|t| t.resource.is_some()).count(),
            ontology_count: tokens.iter().filter(|t| t.ontology.is_some()).count(),
        }
    }
}
