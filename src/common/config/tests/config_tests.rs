//! Unit tests for common-config crate

use common_config::{CostSettings, FederaConfig, OptimizerSettings, PartitionSettings};

#[test]
fn test_federa_config_default() {
    let config = FederaConfig::default();

    assert_eq!(config.optimizer.max_iterations, 100);
    assert_eq!(config.optimizer.max_rule_firings, 10_000);
    assert!(!config.optimizer.enable_trace);
    assert!(!config.optimizer.enable_sort_pushdown);

    assert_eq!(config.partition.min_hash_groups, 2);
}

#[test]
fn test_cost_settings_default_multipliers() {
    let cost = CostSettings::default();

    assert_eq!(cost.multiplier_for("DOCUMENT"), 0.8);
    assert_eq!(cost.multiplier_for("WIDE_COLUMN"), 0.8);
    assert_eq!(cost.multiplier_for("SEARCH"), 0.8);
    assert_eq!(cost.multiplier_for("FILE"), 0.8);
    // Unknown conventions are not discounted
    assert_eq!(cost.multiplier_for("ENUMERABLE"), 1.0);
}

#[test]
fn test_partition_settings_default() {
    let settings = PartitionSettings::default();
    assert_eq!(settings.min_hash_groups, 2);
    assert_eq!(settings.max_partition_groups, 1024);
}

#[test]
fn test_federa_config_serialization() {
    let mut config = FederaConfig::default();
    config.optimizer = OptimizerSettings {
        max_iterations: 8,
        max_rule_firings: 500,
        enable_trace: true,
        enable_sort_pushdown: true,
    };
    config
        .cost
        .adapter_multipliers
        .insert("DOCUMENT".to_string(), 0.5);

    let json = config.to_json().unwrap();
    let restored = FederaConfig::from_json(&json).unwrap();

    assert_eq!(restored, config);
    assert_eq!(restored.cost.multiplier_for("DOCUMENT"), 0.5);
}

#[test]
fn test_partial_json_uses_defaults() {
    let config = FederaConfig::from_json(r#"{"optimizer": {"enable_trace": true}}"#).unwrap();

    assert!(config.optimizer.enable_trace);
    assert_eq!(config.optimizer.max_iterations, 100);
    assert_eq!(config.cost, CostSettings::default());
}

#[test]
fn test_malformed_json_is_an_error() {
    let err = FederaConfig::from_json("{\"optimizer\": 3").unwrap_err();
    assert!(err.to_string().starts_with("SerdeJsonError"));
}
