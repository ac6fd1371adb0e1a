use super::*;
use crate::error::AdvisorError;
use crate::suggestions::DdlDialect;
use pretty_assertions::assert_eq;

const SCHEMA_JSON: &str = r#"{
    "orders": {"row_count": 2000000, "columns": {"customer_id": 150000, "status": 4}},
    "users": {"row_count": 300, "columns": {"id": 300}}
}"#;

#[test]
fn test_new_rejects_invalid_config() {
    let config = AdvisorConfig::new().with_table_size_thresholds(10, 10);
    assert!(matches!(
        IndexAdvisor::new(config),
        Err(AdvisorError::InvalidConfig(_))
    ));
}

#[test]
fn test_from_toml_applies_config() {
    let advisor = IndexAdvisor::from_toml_str("ddl_dialect = \"unquoted\"\nmin_frequency = 0").unwrap();
    assert_eq!(advisor.config().ddl_dialect, DdlDialect::Unquoted);
    assert_eq!(advisor.estimator().config(), advisor.config());

    let mut advisor = advisor;
    advisor.analyze("SELECT * FROM t WHERE a = 1");
    let suggestions = advisor.generate_suggestions_default().unwrap();
    assert_eq!(suggestions[0].ddl, "CREATE INDEX idx_t_a ON t (a);");
}

#[test]
fn test_schema_json_reaches_analyzer_and_estimator() {
    let mut advisor = IndexAdvisor::default()
        .with_schema_stats_json(SCHEMA_JSON)
        .unwrap();
    advisor.analyze_batch(std::iter::repeat_n(
        "SELECT * FROM orders WHERE status = 'open' AND customer_id = 3",
        6,
    ));

    let stats = advisor.usage_stats();
    let status = stats["orders"]
        .iter()
        .find(|e| e.columns() == ["status"])
        .unwrap();
    assert_eq!(status.usage_type(), crate::usage::UsageType::FilterLowCardinality);

    let suggestions = advisor.generate_suggestions(1.5).unwrap();
    assert_eq!(suggestions.len(), 3);
    assert!(suggestions.iter().all(|s| s.impact.score == 1.5));
}

#[test]
fn test_malformed_schema_json() {
    let err = IndexAdvisor::default()
        .with_schema_stats_json("{\"orders\": 5}")
        .unwrap_err();
    assert!(matches!(err, AdvisorError::SchemaStats(_)));
}

#[test]
fn test_estimate_is_read_only() {
    let advisor = IndexAdvisor::default()
        .with_schema_stats_json(SCHEMA_JSON)
        .unwrap();
    let result = advisor.estimate("users", &["id".to_string()], &[]);

    assert_eq!(result.score, -0.5);
    assert_eq!(advisor.analyzer().queries_analyzed(), 0);
}

#[test]
fn test_reset_keeps_configuration() {
    let mut advisor = IndexAdvisor::new(AdvisorConfig::new().with_min_frequency(0)).unwrap();
    advisor.analyze_script("SELECT * FROM t WHERE a = 1; SELECT * FROM t WHERE b = 2");
    assert_eq!(advisor.generate_suggestions(0.5).unwrap().len(), 2);

    advisor.reset();
    assert!(advisor.generate_suggestions(0.5).unwrap().is_empty());
    assert_eq!(advisor.config().min_frequency, 0);
}
