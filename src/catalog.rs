//! Query template catalog: records, validation, loading and hot-swap.
//!
//! A catalog is loaded once (from a file, an embedded string, or any other
//! [`CatalogSource`]) and is immutable afterwards. [`SharedCatalog`] allows a
//! copy-on-write replacement: matchers take a snapshot and keep using it even
//! if the catalog is reloaded underneath them.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// One catalog entry describing an allowable question shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Accepted question openers. Membership is exact and case-sensitive.
    pub start_words: Vec<String>,
    /// Template only applies to questions with a superlative marker.
    #[serde(default)]
    pub superlative: bool,
    /// Example phrasings, compared against the question in this order.
    pub examples: Vec<String>,
    /// Query bodies with `$rN` / `$oN` placeholders.
    pub query_bodies: Vec<String>,
    /// Not enforced unless entity-count filters are enabled.
    #[serde(default)]
    pub min_bound_entities: usize,
    /// Not enforced unless entity-count filters are enabled.
    #[serde(default)]
    pub min_ontology_refs: usize,
}

impl Template {
    pub fn accepts_start_word(&self, word: &str) -> bool {
        self.start_words.iter().any(|w| w == word)
    }

    fn validate(&self, index: usize) -> Result<(), CatalogError> {
        let reason = if self.start_words.is_empty() {
            Some("startWords must not be empty")
        } else if self.examples.is_empty() {
            Some("examples must not be empty")
        } else if self.query_bodies.is_empty() {
            Some("queryBodies must not be empty")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(CatalogError::Invalid {
                index,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Immutable, ordered template collection. Cloning shares the storage.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: Arc<[Template]>,
}

impl Catalog {
    /// Build a catalog, validating every template.
    pub fn new(templates: Vec<Template>) -> Result<Self, CatalogError> {
        for (index, template) in templates.iter().enumerate() {
            template.validate(index)?;
        }
        Ok(Self {
            templates: templates.into(),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON array of templates.
    pub fn from_json_str(source_name: &str, json: &str) -> Result<Self, CatalogError> {
        // An empty file means "no templates configured", not a parse failure.
        if json.trim().is_empty() {
            return Ok(Self::empty());
        }
        let templates: Vec<Template> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
        Self::new(templates)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Where a catalog comes from.
pub trait CatalogSource {
    /// Human-readable name used in diagnostics.
    fn name(&self) -> String;

    fn load(&self) -> Result<Catalog, CatalogError>;
}

/// Catalog stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Catalog, CatalogError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| CatalogError::Read {
            source_name: self.name(),
            message: e.to_string(),
        })?;
        let catalog = Catalog::from_json_str(&self.name(), &content)?;
        tracing::info!(
            "Loaded {} query templates from {}",
            catalog.len(),
            self.path.display()
        );
        Ok(catalog)
    }
}

/// Catalog held as a JSON string: built in memory, or embedded in the binary
/// with `include_str!`.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    json: String,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, json: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            json: json.into(),
        }
    }
}

impl CatalogSource for StaticSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<Catalog, CatalogError> {
        Catalog::from_json_str(&self.name, &self.json)
    }
}

/// Load a catalog, degrading to an empty one on failure.
///
/// The error is logged and handed back so the caller can still report it;
/// matching against the returned catalog is always safe.
pub fn load_or_empty(source: &dyn CatalogSource) -> (Catalog, Option<CatalogError>) {
    match source.load() {
        Ok(catalog) => (catalog, None),
        Err(e) => {
            tracing::error!("Catalog {} unavailable, using empty catalog: {}", source.name(), e);
            (Catalog::empty(), Some(e))
        }
    }
}

/// Catalog holder supporting atomic replacement.
///
/// Readers get a [`Catalog`] snapshot; a concurrent [`SharedCatalog::replace`]
/// never affects a snapshot already taken.
#[derive(Debug, Default)]
pub struct SharedCatalog {
    current: RwLock<Catalog>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(catalog),
        }
    }

    pub fn snapshot(&self) -> Catalog {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Swap in a new catalog, returning the previous one.
    pub fn replace(&self, catalog: Catalog) -> Catalog {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, catalog)
    }

    /// Reload from `source`. On failure the current catalog stays in place.
    pub fn reload(&self, source: &dyn CatalogSource) -> Result<usize, CatalogError> {
        let catalog = source.load()?;
        let count = catalog.len();
        let previous = self.replace(catalog);
        tracing::info!(
            "Catalog {} reloaded: {} -> {} templates",
            source.name(),
            previous.len(),
            count
        );
        Ok(count)
    }
}
