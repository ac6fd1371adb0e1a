use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_defaults_match_heuristic_constants() {
    let config = AdvisorConfig::default();

    assert_eq!(config.max_columns_before_penalty, 3);
    assert_eq!(config.width_penalty_per_column, 0.5);
    assert_eq!(config.small_table_rows, 1_000);
    assert_eq!(config.large_table_rows, 1_000_000);
    assert_eq!(config.min_frequency, 5);
    assert_eq!(config.moderate_impact_breakpoint, 0.5);
    assert_eq!(config.high_impact_breakpoint, 1.5);
    assert!(!config.penalize_writes);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_toml_keeps_defaults_for_missing_keys() {
    let config = AdvisorConfig::from_toml_str(
        r#"
        min_frequency = 10
        penalize_writes = true
        ddl_dialect = "mysql"
        "#,
    )
    .unwrap();

    assert_eq!(config.min_frequency, 10);
    assert!(config.penalize_writes);
    assert_eq!(config.ddl_dialect, DdlDialect::MySql);
    assert_eq!(config.large_table_rows, 1_000_000);
}

#[test]
fn test_from_toml_rejects_malformed_input() {
    let err = AdvisorConfig::from_toml_str("min_frequency = \"many\"").unwrap_err();
    assert!(matches!(err, AdvisorError::ConfigParse(_)));
}

#[test]
fn test_validate_rejects_inverted_table_sizes() {
    let config = AdvisorConfig::new().with_table_size_thresholds(5_000, 100);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("large_table_rows"));
}

#[test]
fn test_validate_rejects_negative_values() {
    let config = AdvisorConfig {
        write_penalty: -1.0,
        ..AdvisorConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(AdvisorError::InvalidConfig(_))
    ));
}

#[test]
fn test_builder_methods() {
    let config = AdvisorConfig::new()
        .with_min_frequency(2)
        .with_default_min_score(1.0)
        .with_low_cardinality_threshold(1.7)
        .with_penalize_writes(true)
        .with_ddl_dialect(DdlDialect::Unquoted);

    assert_eq!(config.min_frequency, 2);
    assert_eq!(config.default_min_score, 1.0);
    assert_eq!(config.low_cardinality_threshold, 1.0);
    assert!(config.penalize_writes);
    assert_eq!(config.ddl_dialect, DdlDialect::Unquoted);
}
