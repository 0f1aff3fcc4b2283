//! Domain-specific error types for question-templates

use thiserror::Error;

/// Main error type for the template matching engine
#[derive(Error, Debug)]
pub enum TemplateMatchError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failure modes when loading a template catalog.
///
/// Kept separate from [`TemplateMatchError`] so callers can tell
/// "no templates configured" (an empty, successfully loaded catalog)
/// apart from "catalog failed to load".
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog from {source_name}: {message}")]
    Read {
        source_name: String,
        message: String,
    },

    #[error("failed to parse catalog from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("invalid template at index {index}: {reason}")]
    Invalid { index: usize, reason: String },
}

impl From<CatalogError> for TemplateMatchError {
    fn from(err: CatalogError) -> Self {
        TemplateMatchError::Catalog {
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for TemplateMatchError {
    fn from(err: anyhow::Error) -> Self {
        TemplateMatchError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TemplateMatchError {
    fn from(err: serde_json::Error) -> Self {
        TemplateMatchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for TemplateMatchError {
    fn from(err: std::io::Error) -> Self {
        TemplateMatchError::Io {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TemplateMatchError {
    fn from(err: toml::de::Error) -> Self {
        TemplateMatchError::Config {
            message: format!("TOML parsing error: {}", err),
        }
    }
}

/// Result type alias for template matching operations
pub type Result<T> = std::result::Result<T, TemplateMatchError>;
