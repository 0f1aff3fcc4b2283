use crate::error::{Result, TemplateMatchError};
use crate::matcher::DEFAULT_THRESHOLD;
use crate::ranking::{DEFAULT_TIE_BREAK_STEP, RankingStrategy};
use crate::similarity::MetricKind;
use crate::substitution::DEFAULT_MAX_BINDINGS;
use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from question_templates.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Scoring, filtering and ranking behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub threshold: f64,
    pub tie_break_step: f64,
    pub metric: MetricKind,
    pub case_insensitive: bool,
    pub ranking: RankingStrategy,
    /// Enforce the templates' minBoundEntities / minOntologyRefs hints
    pub enforce_entity_counts: bool,
    pub max_bindings_per_template: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            tie_break_step: DEFAULT_TIE_BREAK_STEP,
            metric: MetricKind::default(),
            case_insensitive: false,
            ranking: RankingStrategy::default(),
            enforce_entity_counts: false,
            max_bindings_per_template: DEFAULT_MAX_BINDINGS,
        }
    }
}

/// Where the template catalog lives
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: String,
    /// Fail startup instead of falling back to an empty catalog
    pub strict: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "query_templates.json".to_string(),
            strict: false,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "question_templates=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(level) = std::env::var("QT_LOG_LEVEL")
            && !level.trim().is_empty()
        {
            cfg.log_level = level;
        }
        cfg
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses QUESTION_TEMPLATES_CONFIG environment variable or defaults to "question_templates.toml"
    pub fn load() -> Result<Self> {
        if let Ok(env_path) = std::env::var("QT_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }

        let config_path = std::env::var("QUESTION_TEMPLATES_CONFIG")
            .unwrap_or_else(|_| "question_templates.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load from an explicit TOML path, then apply env overrides and validate.
    /// A missing file means defaults.
    pub fn load_from(config_path: &str) -> Result<Self> {
        let mut config = match std::fs::read_to_string(config_path) {
            Ok(content) => Self::from_toml_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", config_path);
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };

        config.apply_env_overrides()?;
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply QT_* environment overrides (env-first)
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("QT_CATALOG_PATH") {
            self.catalog.path = path;
            tracing::debug!("QT_CATALOG_PATH env override applied");
        }
        if let Ok(strict) = std::env::var("QT_CATALOG_STRICT") {
            self.catalog.strict = parse_flag(&strict);
        }
        if let Some(threshold) = env_parse::<f64>("QT_THRESHOLD")? {
            self.matching.threshold = threshold;
        }
        if let Some(step) = env_parse::<f64>("QT_TIE_BREAK_STEP")? {
            self.matching.tie_break_step = step;
        }
        if let Ok(metric) = std::env::var("QT_METRIC") {
            self.matching.metric = metric
                .parse()
                .map_err(|message| TemplateMatchError::Config { message })?;
        }
        if let Ok(ranking) = std::env::var("QT_RANKING") {
            self.matching.ranking = ranking
                .parse()
                .map_err(|message| TemplateMatchError::Config { message })?;
        }
        if let Ok(fold) = std::env::var("QT_CASE_INSENSITIVE") {
            self.matching.case_insensitive = parse_flag(&fold);
        }
        if let Ok(enforce) = std::env::var("QT_ENFORCE_ENTITY_COUNTS") {
            self.matching.enforce_entity_counts = parse_flag(&enforce);
        }
        if let Some(max) = env_parse::<usize>("QT_MAX_BINDINGS")? {
            self.matching.max_bindings_per_template = max;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let m = &self.matching;
        if !(m.threshold > 0.0 && m.threshold <= 1.0) {
            return Err(TemplateMatchError::Validation {
                message: format!("threshold must be in (0, 1], got {}", m.threshold),
            });
        }
        if !(m.tie_break_step.is_finite() && m.tie_break_step > 0.0) {
            return Err(TemplateMatchError::Validation {
                message: format!("tie_break_step must be > 0, got {}", m.tie_break_step),
            });
        }
        if m.max_bindings_per_template == 0 {
            return Err(TemplateMatchError::Validation {
                message: "max_bindings_per_template must be at least 1".to_string(),
            });
        }
        if self.catalog.path.trim().is_empty() {
            return Err(TemplateMatchError::Validation {
                message: "catalog.path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| TemplateMatchError::Config {
                message: format!("{} has invalid value '{}'", key, raw),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matching.threshold, 0.5);
        assert_eq!(config.matching.tie_break_step, 0.001);
        assert_eq!(config.matching.ranking, RankingStrategy::ScoreThenPosition);
        assert!(!config.matching.enforce_entity_counts);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [matching]
            metric = "jaro_winkler"
            ranking = "legacy_offset"

            [catalog]
            path = "templates/qald.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.matching.metric, MetricKind::JaroWinkler);
        assert_eq!(config.matching.ranking, RankingStrategy::LegacyOffset);
        assert_eq!(config.matching.threshold, 0.5);
        assert_eq!(config.catalog.path, "templates/qald.json");
        assert!(!config.catalog.strict);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[matching\nthreshold = ").unwrap_err();
        assert!(matches!(err, TemplateMatchError::Config { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.matching.threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.matching.tie_break_step = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.matching.max_bindings_per_template = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag("0"));
    }
}
