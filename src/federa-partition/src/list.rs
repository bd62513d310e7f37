//! LIST partitioning.

use std::cmp::Ordering;
use std::collections::HashSet;

use common_config::PartitionSettings;
use common_error::{FederaResult, ensure};
use federa_catalog::{PartitionGroup, PartitionGroupId, PartitionKind};
use federa_core::{DataType, Value};

use crate::manager::{PartitionManager, PartitionRequest, unbound_group, validate_group_count};

/// Whether `value` equals the qualifier text `qualifier` read as
/// `column_type`.
pub(crate) fn qualifier_matches(qualifier: &str, column_type: &DataType, value: &Value) -> bool {
    if value.is_null() {
        return false;
    }
    match Value::parse(qualifier, column_type) {
        Ok(parsed) => parsed.compare(value) == Some(Ordering::Equal),
        Err(_) => qualifier == value.canonical_text(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListPartitionManager;

impl PartitionManager for ListPartitionManager {
    fn kind(&self) -> PartitionKind {
        PartitionKind::List
    }

    fn requires_unbound_group(&self) -> bool {
        true
    }

    fn validate(&self, request: &PartitionRequest<'_>, settings: &PartitionSettings) -> FederaResult<()> {
        let lists = request.qualifiers;
        ensure!(!lists.is_empty(), PartitionError: "LIST partitioning requires qualifiers");
        ensure!(
            request.group_count == lists.len() + 1,
            PartitionError: "LIST partitioning with {} qualifier lists requires {} partition groups (including UNBOUND), got {}",
            lists.len(),
            lists.len() + 1,
            request.group_count
        );
        let mut seen = HashSet::new();
        for (i, list) in lists.iter().enumerate() {
            ensure!(!list.is_empty(), PartitionError: "partition group {i} has no qualifiers");
            for qualifier in list {
                if request.column_type.is_numeric() {
                    ensure!(
                        Value::parse(qualifier, request.column_type).is_ok(),
                        PartitionError: "qualifier '{qualifier}' is not a valid number for a {} partition column",
                        request.column_type
                    );
                }
                ensure!(
                    seen.insert(qualifier.trim()),
                    PartitionError: "qualifier '{qualifier}' appears in more than one partition group"
                );
            }
        }
        validate_group_count(PartitionKind::List, request, settings)
    }

    fn target_partition(
        &self,
        groups: &[&PartitionGroup],
        column_type: &DataType,
        value: &Value,
    ) -> FederaResult<PartitionGroupId> {
        groups
            .iter()
            .filter(|g| !g.is_unbound)
            .find(|g| g.qualifiers.iter().any(|q| qualifier_matches(q, column_type, value)))
            .map_or_else(|| unbound_group(groups, value), |g| Ok(g.id))
    }
}
