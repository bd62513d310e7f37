//! Routing rows to partition groups and guarding placement changes.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use common_config::PartitionSettings;
use common_error::{FederaError, FederaResult};
use federa_catalog::{
    CatalogReader, CatalogWriter, ColumnId, PartitionGroupId, PartitionKind, PartitionProperty,
    Placement, StoreId, TableId,
};
use federa_core::Value;
use log::{debug, warn};

use crate::manager::{PartitionManager, PartitionRequest, partition_manager_for};

/// Name of the catch-all group created for LIST and RANGE tables.
pub const UNBOUND_GROUP_NAME: &str = "UNBOUND";

/// Partition routing for the tables of one catalog.
///
/// Reads use a catalog snapshot taken per call. Changes that can strand a
/// partition group (repartitioning, dropping placements) hold a per-table
/// lock across both the check and the catalog mutation, so two concurrent
/// drops cannot both pass the check against the same state.
pub struct PartitionRouter {
    catalog: Arc<dyn CatalogWriter>,
    settings: PartitionSettings,
    locks: Mutex<HashMap<TableId, Arc<Mutex<()>>>>,
}

impl PartitionRouter {
    pub fn new(catalog: Arc<dyn CatalogWriter>, settings: PartitionSettings) -> Self {
        Self {
            catalog,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &PartitionSettings {
        &self.settings
    }

    fn table_lock(&self, table: TableId) -> FederaResult<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| FederaError::poisoned("partition router lock table"))?;
        Ok(Arc::clone(locks.entry(table).or_default()))
    }

    /// Run `f` while holding `table`'s lock.
    fn with_table_lock<T>(&self, table: TableId, f: impl FnOnce() -> FederaResult<T>) -> FederaResult<T> {
        let lock = self.table_lock(table)?;
        let _guard = lock
            .lock()
            .map_err(|_| FederaError::poisoned("partition router table lock"))?;
        f()
    }

    /// Partition `table` by `column`: create one group per qualifier list
    /// (or `group_count` groups for HASH) plus UNBOUND where the function
    /// needs it, and install the function. Returns the groups in routing
    /// order.
    ///
    /// Existing groups, and the placements on them, are dropped.
    pub fn partition_table(
        &self,
        table: TableId,
        kind: PartitionKind,
        column: &str,
        group_count: usize,
        qualifiers: Vec<Vec<String>>,
    ) -> FederaResult<Vec<PartitionGroupId>> {
        let manager = partition_manager_for(kind);
        self.with_table_lock(table, || {
            let reader = self.catalog.reader()?;
            let column = reader.column_by_name(table, column)?;
            manager.validate(
                &PartitionRequest {
                    column_type: &column.data_type,
                    group_count,
                    qualifiers: &qualifiers,
                },
                &self.settings,
            )?;

            let mut groups = Vec::with_capacity(group_count);
            if kind == PartitionKind::Hash {
                for i in 0..group_count {
                    groups.push(self.catalog.add_partition_group(table, &format!("p{i}"), Vec::new(), false)?);
                }
            } else {
                for (i, list) in qualifiers.iter().enumerate() {
                    groups.push(self.catalog.add_partition_group(table, &format!("p{i}"), list.clone(), false)?);
                }
            }
            if manager.requires_unbound_group() {
                groups.push(self.catalog.add_partition_group(table, UNBOUND_GROUP_NAME, Vec::new(), true)?);
            }
            self.catalog.partition_table(
                table,
                PartitionProperty {
                    kind,
                    column: column.id,
                },
                groups.clone(),
            )?;
            debug!("partitioned table {table} by {kind} on {} into {} groups", column.name, groups.len());
            Ok(groups)
        })
    }

    /// Group holding rows of `table` whose partition column equals `value`.
    /// An unpartitioned table has a single group.
    pub fn target_partition(&self, table: TableId, value: &Value) -> FederaResult<PartitionGroupId> {
        let reader = self.catalog.reader()?;
        target_in(reader.as_ref(), table, value)
    }

    /// Group every value by its target partition group; each entry lists
    /// the positions of the values routed there.
    pub fn route_rows(&self, table: TableId, values: &[Value]) -> FederaResult<BTreeMap<PartitionGroupId, Vec<usize>>> {
        let reader = self.catalog.reader()?;
        let mut routed: BTreeMap<PartitionGroupId, Vec<usize>> = BTreeMap::new();
        for (i, value) in values.iter().enumerate() {
            routed.entry(target_in(reader.as_ref(), table, value)?).or_default().push(i);
        }
        Ok(routed)
    }

    /// For each partition, one placement per column of `table`.
    pub fn relevant_placements(
        &self,
        table: TableId,
        partitions: &[PartitionGroupId],
    ) -> FederaResult<BTreeMap<PartitionGroupId, Vec<Placement>>> {
        let reader = self.catalog.reader()?;
        manager_of(reader.as_ref(), table)?.relevant_placements(reader.as_ref(), table, partitions)
    }

    /// Whether `store` could drop `column` without leaving a partition
    /// group of `table` unserved.
    pub fn probe_distribution_change(&self, table: TableId, store: StoreId, column: ColumnId) -> FederaResult<bool> {
        self.with_table_lock(table, || {
            let reader = self.catalog.reader()?;
            manager_of(reader.as_ref(), table)?.probe_distribution_change(reader.as_ref(), table, store, column)
        })
    }

    /// Drop `column` from `store`, refusing if that would strand a
    /// partition group.
    pub fn drop_column_placement(&self, table: TableId, store: StoreId, column: ColumnId) -> FederaResult<()> {
        self.with_table_lock(table, || {
            let reader = self.catalog.reader()?;
            let manager = manager_of(reader.as_ref(), table)?;
            if !manager.probe_distribution_change(reader.as_ref(), table, store, column)? {
                let name = &reader.column(column)?.name;
                warn!("refusing to drop column {name} from store {store}: a partition group would lose its last placement");
                return Err(FederaError::placement(format!(
                    "dropping column {name} from store {store} would leave a partition group of table {table} without a placement"
                )));
            }
            self.catalog.delete_column_placement(store, column)
        })
    }

    /// Drop every column of `table` from `store`, under the same check.
    pub fn drop_data_placement(&self, table: TableId, store: StoreId) -> FederaResult<()> {
        self.with_table_lock(table, || {
            let reader = self.catalog.reader()?;
            let manager = manager_of(reader.as_ref(), table)?;
            for column in &reader.table(table)?.columns {
                if !manager.probe_distribution_change(reader.as_ref(), table, store, *column)? {
                    warn!("refusing to drop table {table} from store {store}: column {column} has no other placement");
                    return Err(FederaError::placement(format!(
                        "store {store} holds the last placement of column {column} for a partition group of table {table}"
                    )));
                }
            }
            self.catalog.delete_data_placement(store, table)
        })
    }
}

/// The partition function of `table`; unpartitioned tables use HASH over
/// their single group.
fn manager_of(catalog: &dyn CatalogReader, table: TableId) -> FederaResult<&'static dyn PartitionManager> {
    let kind = catalog.partitioning(table)?.map_or(PartitionKind::Hash, |p| p.kind);
    Ok(partition_manager_for(kind))
}

fn target_in(catalog: &dyn CatalogReader, table: TableId, value: &Value) -> FederaResult<PartitionGroupId> {
    let groups = catalog.partition_groups(table)?;
    let Some(property) = catalog.partitioning(table)? else {
        return match groups.as_slice() {
            [only] => Ok(only.id),
            _ => Err(FederaError::partition(format!(
                "unpartitioned table {table} has {} partition groups",
                groups.len()
            ))),
        };
    };
    let column = catalog.column(property.column)?;
    partition_manager_for(property.kind).target_partition(&groups, &column.data_type, value)
}
