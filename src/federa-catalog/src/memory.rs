//! Copy-on-write in-memory catalog.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, RwLock};

use common_error::{FederaError, FederaResult};
use federa_core::{BackendKind, like_match};
use log::debug;

use crate::def::TableDef;
use crate::ids::{ColumnId, PartitionGroupId, StoreId, TableId};
use crate::model::{
    ColumnEntry, ColumnPlacement, PartitionGroup, PartitionProperty, Placement, StoreEntry,
    TableEntry,
};
use crate::reader::{CatalogReader, CatalogWriter};

/// Name of the group every unpartitioned table starts with.
const DEFAULT_GROUP: &str = "default";

/// One immutable catalog state.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    version: u64,
    next_id: u64,
    stores: BTreeMap<StoreId, StoreEntry>,
    tables: BTreeMap<TableId, TableEntry>,
    columns: BTreeMap<ColumnId, ColumnEntry>,
    groups: BTreeMap<PartitionGroupId, PartitionGroup>,
    placements: BTreeSet<Placement>,
    column_placements: BTreeMap<(StoreId, ColumnId), ColumnPlacement>,
}

impl CatalogSnapshot {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn table_mut(&mut self, id: TableId) -> FederaResult<&mut TableEntry> {
        self.tables
            .get_mut(&id)
            .ok_or_else(|| FederaError::catalog(format!("table {id} does not exist")))
    }

    fn new_group(
        &mut self,
        table: TableId,
        name: &str,
        qualifiers: Vec<String>,
        is_unbound: bool,
    ) -> PartitionGroupId {
        let id = PartitionGroupId(self.allocate());
        self.groups.insert(
            id,
            PartitionGroup {
                id,
                table_id: table,
                name: name.to_string(),
                qualifiers,
                is_unbound,
            },
        );
        id
    }

    fn resolve_key(
        &self,
        table: TableId,
        by_name: &BTreeMap<String, ColumnId>,
        names: &[String],
    ) -> FederaResult<Vec<ColumnId>> {
        names
            .iter()
            .map(|n| {
                by_name.get(n).copied().ok_or_else(|| {
                    FederaError::catalog(format!("key column '{n}' does not exist in table {table}"))
                })
            })
            .collect()
    }
}

impl CatalogReader for CatalogSnapshot {
    fn version(&self) -> u64 {
        self.version
    }

    fn table(&self, id: TableId) -> FederaResult<&TableEntry> {
        self.tables
            .get(&id)
            .ok_or_else(|| FederaError::catalog(format!("table {id} does not exist")))
    }

    fn table_by_name(&self, namespace: &str, name: &str) -> FederaResult<&TableEntry> {
        self.tables
            .values()
            .find(|t| t.namespace == namespace && t.name == name)
            .ok_or_else(|| FederaError::catalog(format!("table '{namespace}.{name}' does not exist")))
    }

    fn tables_matching(
        &self,
        namespace_pattern: Option<&str>,
        name_pattern: &str,
    ) -> Vec<&TableEntry> {
        self.tables
            .values()
            .filter(|t| namespace_pattern.is_none_or(|p| like_match(&t.namespace, p)))
            .filter(|t| like_match(&t.name, name_pattern))
            .collect()
    }

    fn column(&self, id: ColumnId) -> FederaResult<&ColumnEntry> {
        self.columns
            .get(&id)
            .ok_or_else(|| FederaError::catalog(format!("column {id} does not exist")))
    }

    fn store(&self, id: StoreId) -> FederaResult<&StoreEntry> {
        self.stores
            .get(&id)
            .ok_or_else(|| FederaError::catalog(format!("store {id} does not exist")))
    }

    fn stores(&self) -> Vec<&StoreEntry> {
        self.stores.values().collect()
    }

    fn partition_group(&self, id: PartitionGroupId) -> FederaResult<&PartitionGroup> {
        self.groups
            .get(&id)
            .ok_or_else(|| FederaError::catalog(format!("partition group {id} does not exist")))
    }

    fn placements_for_column(&self, column: ColumnId) -> Vec<Placement> {
        self.placements
            .iter()
            .filter(|p| p.column_id == column)
            .copied()
            .collect()
    }

    fn column_placement(&self, store: StoreId, column: ColumnId) -> Option<&ColumnPlacement> {
        self.column_placements.get(&(store, column))
    }
}

/// Thread-safe catalog publishing immutable [`CatalogSnapshot`]s.
///
/// Mutations clone the current snapshot, apply the change and swap it in under
/// the write lock; a failed mutation publishes nothing.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> FederaResult<Arc<CatalogSnapshot>> {
        let guard = self
            .current
            .read()
            .map_err(|_| FederaError::poisoned("catalog"))?;
        Ok(Arc::clone(&guard))
    }

    fn mutate<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut CatalogSnapshot) -> FederaResult<T>,
    ) -> FederaResult<T> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| FederaError::poisoned("catalog"))?;
        let mut next = CatalogSnapshot::clone(&guard);
        let result = f(&mut next)?;
        next.version += 1;
        debug!("catalog {op}: published version {}", next.version);
        *guard = Arc::new(next);
        Ok(result)
    }
}

impl CatalogWriter for InMemoryCatalog {
    fn reader(&self) -> FederaResult<Arc<dyn CatalogReader>> {
        let snapshot: Arc<dyn CatalogReader> = self.snapshot()?;
        Ok(snapshot)
    }

    fn add_store(&self, name: &str, kind: BackendKind) -> FederaResult<StoreId> {
        self.mutate("add_store", |state| {
            if state.stores.values().any(|s| s.name == name) {
                return Err(FederaError::catalog(format!("store '{name}' already exists")));
            }
            let id = StoreId(state.allocate());
            state.stores.insert(
                id,
                StoreEntry {
                    id,
                    name: name.to_string(),
                    kind,
                },
            );
            Ok(id)
        })
    }

    fn create_table(&self, def: TableDef) -> FederaResult<TableId> {
        self.mutate("create_table", |state| {
            if state.table_by_name(&def.namespace, &def.name).is_ok() {
                return Err(FederaError::catalog(format!(
                    "table '{}.{}' already exists",
                    def.namespace, def.name
                )));
            }
            if def.columns.is_empty() {
                return Err(FederaError::catalog(format!(
                    "table '{}.{}' must have at least one column",
                    def.namespace, def.name
                )));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = def.columns.iter().find(|c| !seen.insert(c.name.as_str())) {
                return Err(FederaError::catalog(format!(
                    "duplicate column '{}' in table '{}.{}'",
                    dup.name, def.namespace, def.name
                )));
            }

            let table_id = TableId(state.allocate());
            let mut by_name = BTreeMap::new();
            let mut columns = Vec::with_capacity(def.columns.len());
            for (position, column) in def.columns.into_iter().enumerate() {
                let id = ColumnId(state.allocate());
                by_name.insert(column.name.clone(), id);
                columns.push(id);
                state.columns.insert(
                    id,
                    ColumnEntry {
                        id,
                        table_id,
                        name: column.name,
                        data_type: column.data_type,
                        nullable: column.nullable,
                        position,
                    },
                );
            }
            let partition_key = state.resolve_key(table_id, &by_name, &def.partition_key)?;
            let clustering_key = state.resolve_key(table_id, &by_name, &def.clustering_key)?;
            let group = state.new_group(table_id, DEFAULT_GROUP, Vec::new(), false);

            state.tables.insert(
                table_id,
                TableEntry {
                    id: table_id,
                    namespace: def.namespace,
                    name: def.name,
                    columns,
                    partition_key,
                    clustering_key,
                    row_count: def.row_count,
                    partition_groups: vec![group],
                    partitioning: None,
                },
            );
            Ok(table_id)
        })
    }

    fn add_partition_group(
        &self,
        table: TableId,
        name: &str,
        qualifiers: Vec<String>,
        is_unbound: bool,
    ) -> FederaResult<PartitionGroupId> {
        self.mutate("add_partition_group", |state| {
            state.table(table)?;
            Ok(state.new_group(table, name, qualifiers, is_unbound))
        })
    }

    fn partition_table(
        &self,
        table: TableId,
        property: PartitionProperty,
        groups: Vec<PartitionGroupId>,
    ) -> FederaResult<()> {
        self.mutate("partition_table", |state| {
            if groups.is_empty() {
                return Err(FederaError::catalog(format!(
                    "table {table} needs at least one partition group"
                )));
            }
            let column = state.column(property.column)?;
            if column.table_id != table {
                return Err(FederaError::catalog(format!(
                    "partition column {} does not belong to table {table}",
                    property.column
                )));
            }
            for id in &groups {
                if state.partition_group(*id)?.table_id != table {
                    return Err(FederaError::catalog(format!(
                        "partition group {id} does not belong to table {table}"
                    )));
                }
            }

            let keep: HashSet<PartitionGroupId> = groups.iter().copied().collect();
            state
                .groups
                .retain(|id, g| g.table_id != table || keep.contains(id));
            let live = &state.groups;
            state
                .placements
                .retain(|p| live.contains_key(&p.partition_group_id));

            let entry = state.table_mut(table)?;
            entry.partitioning = Some(property);
            entry.partition_groups = groups;
            Ok(())
        })
    }

    fn add_placement(
        &self,
        store: StoreId,
        column: ColumnId,
        group: PartitionGroupId,
    ) -> FederaResult<()> {
        self.mutate("add_placement", |state| {
            state.store(store)?;
            let table = state.column(column)?.table_id;
            if state.partition_group(group)?.table_id != table {
                return Err(FederaError::catalog(format!(
                    "partition group {group} does not belong to table {table}"
                )));
            }
            state.placements.insert(Placement {
                partition_group_id: group,
                store_id: store,
                column_id: column,
            });
            state
                .column_placements
                .entry((store, column))
                .or_insert_with(|| ColumnPlacement {
                    store_id: store,
                    column_id: column,
                    physical_schema: None,
                    physical_table: None,
                    physical_column: None,
                });
            Ok(())
        })
    }

    fn update_column_placement_physical_names(
        &self,
        store: StoreId,
        column: ColumnId,
        physical_schema: &str,
        physical_table: &str,
        physical_column: &str,
    ) -> FederaResult<()> {
        self.mutate("update_column_placement_physical_names", |state| {
            let placement = state
                .column_placements
                .get_mut(&(store, column))
                .ok_or_else(|| {
                    FederaError::catalog(format!("store {store} holds no placement of column {column}"))
                })?;
            placement.physical_schema = Some(physical_schema.to_string());
            placement.physical_table = Some(physical_table.to_string());
            placement.physical_column = Some(physical_column.to_string());
            Ok(())
        })
    }

    fn delete_column_placement(&self, store: StoreId, column: ColumnId) -> FederaResult<()> {
        self.mutate("delete_column_placement", |state| {
            state
                .placements
                .retain(|p| !(p.store_id == store && p.column_id == column));
            state.column_placements.remove(&(store, column));
            Ok(())
        })
    }

    fn delete_data_placement(&self, store: StoreId, table: TableId) -> FederaResult<()> {
        self.mutate("delete_data_placement", |state| {
            let columns: HashSet<ColumnId> = state.table(table)?.columns.iter().copied().collect();
            state
                .placements
                .retain(|p| !(p.store_id == store && columns.contains(&p.column_id)));
            state
                .column_placements
                .retain(|(s, c), _| !(*s == store && columns.contains(c)));
            Ok(())
        })
    }

    fn set_row_count(&self, table: TableId, rows: f64) -> FederaResult<()> {
        self.mutate("set_row_count", |state| {
            if !rows.is_finite() || rows < 0.0 {
                return Err(FederaError::value_error(format!(
                    "row count must be a non-negative number, got {rows}"
                )));
            }
            state.table_mut(table)?.row_count = Some(rows);
            Ok(())
        })
    }
}
