//! Partition function interface.

use std::collections::BTreeMap;

use common_config::PartitionSettings;
use common_error::{FederaError, FederaResult};
use federa_catalog::{
    CatalogReader, ColumnId, PartitionGroup, PartitionGroupId, PartitionKind, Placement, StoreId,
    TableId,
};
use federa_core::{DataType, Value};

use crate::hash::HashPartitionManager;
use crate::list::ListPartitionManager;
use crate::range::RangePartitionManager;

/// A proposed partitioning, checked before any catalog change.
#[derive(Debug, Clone, Copy)]
pub struct PartitionRequest<'a> {
    /// Type of the partition column.
    pub column_type: &'a DataType,
    /// Total number of partition groups, UNBOUND included.
    pub group_count: usize,
    /// Qualifiers of every group except UNBOUND.
    pub qualifiers: &'a [Vec<String>],
}

/// One partition function.
///
/// Validation and routing differ per function; placement selection and the
/// drop probe only look at the catalog and are shared.
pub trait PartitionManager: Send + Sync {
    fn kind(&self) -> PartitionKind;

    /// Whether the function needs a catch-all group for unmatched values.
    fn requires_unbound_group(&self) -> bool;

    /// Reject a partitioning this function cannot route. The message is
    /// meant for the user and is surfaced verbatim.
    fn validate(&self, request: &PartitionRequest<'_>, settings: &PartitionSettings) -> FederaResult<()>;

    /// Group holding rows whose partition column equals `value`. `groups`
    /// are the table's groups in routing order.
    fn target_partition(
        &self,
        groups: &[&PartitionGroup],
        column_type: &DataType,
        value: &Value,
    ) -> FederaResult<PartitionGroupId>;

    /// For each requested partition, one placement per table column (in
    /// column order). Among the stores covering a column for a partition,
    /// a store covering that column for every partition is preferred, then
    /// the lowest store id.
    fn relevant_placements(
        &self,
        catalog: &dyn CatalogReader,
        table: TableId,
        partitions: &[PartitionGroupId],
    ) -> FederaResult<BTreeMap<PartitionGroupId, Vec<Placement>>> {
        let entry = catalog.table(table)?;
        let mut result = BTreeMap::new();
        for partition in partitions {
            if !entry.partition_groups.contains(partition) {
                return Err(FederaError::partition(format!(
                    "partition group {partition} does not belong to {}",
                    entry.qualified_name()
                )));
            }
            let mut chosen = Vec::with_capacity(entry.columns.len());
            for column in &entry.columns {
                let placements = catalog.placements_for_column(*column);
                let is_full = |store: StoreId| {
                    entry.partition_groups.iter().all(|g| {
                        placements
                            .iter()
                            .any(|p| p.store_id == store && p.partition_group_id == *g)
                    })
                };
                let pick = placements
                    .iter()
                    .filter(|p| p.partition_group_id == *partition)
                    .min_by_key(|p| (!is_full(p.store_id), p.store_id))
                    .ok_or_else(|| {
                        FederaError::placement(format!(
                            "no store holds column {} of {} for partition group {partition}",
                            catalog.column(*column).map_or("?", |c| c.name.as_str()),
                            entry.qualified_name()
                        ))
                    })?;
                chosen.push(*pick);
            }
            result.insert(*partition, chosen);
        }
        Ok(result)
    }

    /// Whether `column` stays available for every partition group of
    /// `table` once `store` drops it.
    fn probe_distribution_change(
        &self,
        catalog: &dyn CatalogReader,
        table: TableId,
        store: StoreId,
        column: ColumnId,
    ) -> FederaResult<bool> {
        let entry = catalog.table(table)?;
        let remaining: Vec<Placement> = catalog
            .placements_for_column(column)
            .into_iter()
            .filter(|p| p.store_id != store)
            .collect();
        Ok(entry
            .partition_groups
            .iter()
            .all(|g| remaining.iter().any(|p| p.partition_group_id == *g)))
    }
}

/// The manager for partition function `kind`.
pub fn partition_manager_for(kind: PartitionKind) -> &'static dyn PartitionManager {
    match kind {
        PartitionKind::Hash => &HashPartitionManager,
        PartitionKind::List => &ListPartitionManager,
        PartitionKind::Range => &RangePartitionManager,
    }
}

/// Checks shared by every partition function.
pub(crate) fn validate_group_count(
    kind: PartitionKind,
    request: &PartitionRequest<'_>,
    settings: &PartitionSettings,
) -> FederaResult<()> {
    common_error::ensure!(
        request.group_count <= settings.max_partition_groups,
        PartitionError: "{kind} partitioning supports at most {} partition groups, got {}",
        settings.max_partition_groups,
        request.group_count
    );
    Ok(())
}

/// The catch-all group, or an error naming the unmatched value.
pub(crate) fn unbound_group(groups: &[&PartitionGroup], value: &Value) -> FederaResult<PartitionGroupId> {
    groups
        .iter()
        .find(|g| g.is_unbound)
        .map(|g| g.id)
        .ok_or_else(|| FederaError::partition(format!("no partition group accepts {value} and there is no UNBOUND group")))
}
