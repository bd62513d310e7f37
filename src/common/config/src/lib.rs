//! Configuration management for Federa.
//!
//! Provides the settings consumed by the optimizer, the cost model and the
//! partition router. A [`FederaConfig`] is an explicit value handed to the
//! components that need it; nothing here is process-global.

use std::collections::BTreeMap;

use common_error::FederaResult;
use serde::{Deserialize, Serialize};

/// Top-level Federa configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FederaConfig {
    /// Rule engine configuration.
    pub optimizer: OptimizerSettings,
    /// Cost model configuration.
    pub cost: CostSettings,
    /// Partitioning configuration.
    pub partition: PartitionSettings,
}

impl FederaConfig {
    /// Parse a configuration from JSON. Missing sections fall back to defaults.
    pub fn from_json(json: &str) -> FederaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this configuration to pretty-printed JSON.
    pub fn to_json(&self) -> FederaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Rule engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Maximum number of exploration rounds.
    pub max_iterations: usize,
    /// Maximum number of rule firings across all rounds.
    pub max_rule_firings: usize,
    /// Record a trace entry for every rule firing.
    pub enable_trace: bool,
    /// Register native sort pushdown rules.
    pub enable_sort_pushdown: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_rule_firings: 10_000,
            enable_trace: false,
            enable_sort_pushdown: false,
        }
    }
}

/// Cost model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSettings {
    /// Weight of the cpu component when costs are totalled.
    pub cpu_weight: f64,
    /// Weight of the io component when costs are totalled.
    pub io_weight: f64,
    /// Flat multipliers applied to nodes under a backend convention, keyed by
    /// backend kind name (`DOCUMENT`, `WIDE_COLUMN`, `SEARCH`, `FILE`).
    pub adapter_multipliers: BTreeMap<String, f64>,
    /// Row estimate for tables without statistics.
    pub default_row_count: f64,
}

impl CostSettings {
    /// Multiplier for the given backend kind, `1.0` if none is configured.
    pub fn multiplier_for(&self, backend: &str) -> f64 {
        self.adapter_multipliers
            .get(backend)
            .copied()
            .unwrap_or(1.0)
    }
}

impl Default for CostSettings {
    fn default() -> Self {
        let adapter_multipliers = ["DOCUMENT", "WIDE_COLUMN", "SEARCH", "FILE"]
            .into_iter()
            .map(|kind| (kind.to_string(), 0.8))
            .collect();
        Self {
            cpu_weight: 1.0,
            io_weight: 4.0,
            adapter_multipliers,
            default_row_count: 100.0,
        }
    }
}

/// Partitioning settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionSettings {
    /// Minimum number of groups a HASH partitioned table must declare.
    pub min_hash_groups: usize,
    /// Upper bound on partition groups per table.
    pub max_partition_groups: usize,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            min_hash_groups: 2,
            max_partition_groups: 1024,
        }
    }
}
