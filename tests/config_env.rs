//! Environment override tests for configuration loading.
//!
//! Kept in a single test so no other test in this binary races on the
//! process environment.

use question_templates::config::Config;
use question_templates::ranking::RankingStrategy;
use question_templates::similarity::MetricKind;
use question_templates::TemplateMatchError;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_env_overrides_toml_values() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[matching]
threshold = 0.6
metric = "sorensen_dice"

[catalog]
path = "from_toml.json"
"#
    )
    .unwrap();
    let path = file.path().display().to_string();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.matching.threshold, 0.6);
    assert_eq!(config.matching.metric, MetricKind::SorensenDice);
    assert_eq!(config.catalog.path, "from_toml.json");

    unsafe {
        std::env::set_var("QT_CATALOG_PATH", "from_env.json");
        std::env::set_var("QT_THRESHOLD", "0.7");
        std::env::set_var("QT_RANKING", "legacy");
        std::env::set_var("QT_ENFORCE_ENTITY_COUNTS", "true");
        std::env::set_var("QT_LOG_LEVEL", "question_templates=debug");
    }
    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.catalog.path, "from_env.json");
    assert_eq!(config.matching.threshold, 0.7);
    assert_eq!(config.matching.ranking, RankingStrategy::LegacyOffset);
    assert!(config.matching.enforce_entity_counts);
    assert_eq!(config.runtime.log_level, "question_templates=debug");

    unsafe {
        std::env::set_var("QT_THRESHOLD", "not-a-number");
    }
    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, TemplateMatchError::Config { .. }));

    unsafe {
        std::env::set_var("QT_THRESHOLD", "1.5");
    }
    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, TemplateMatchError::Validation { .. }));

    unsafe {
        std::env::remove_var("QT_CATALOG_PATH");
        std::env::remove_var("QT_THRESHOLD");
        std::env::remove_var("QT_RANKING");
        std::env::remove_var("QT_ENFORCE_ENTITY_COUNTS");
        std::env::remove_var("QT_LOG_LEVEL");
    }
    let config = Config::load_from("/nonexistent/question_templates.toml").unwrap();
    assert_eq!(config.matching.threshold, 0.5);
}
