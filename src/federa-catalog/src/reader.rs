//! Collaborator traits through which planning components see the catalog.

use std::sync::Arc;

use common_error::{FederaError, FederaResult};
use federa_core::{BackendKind, RowType};

use crate::ids::{ColumnId, PartitionGroupId, StoreId, TableId};
use crate::model::{
    ColumnEntry, ColumnPlacement, PartitionGroup, PartitionProperty, Placement, StoreEntry,
    TableEntry, row_type_of,
};

/// Read accessors over one consistent catalog state.
///
/// Implementations must be pure: two calls with the same arguments against
/// the same reader return the same answer.
pub trait CatalogReader: Send + Sync {
    /// Monotonic version of the state this reader observes.
    fn version(&self) -> u64;

    /// Look up a table by id.
    fn table(&self, id: TableId) -> FederaResult<&TableEntry>;

    /// Look up a table by namespace and name.
    fn table_by_name(&self, namespace: &str, name: &str) -> FederaResult<&TableEntry>;

    /// Tables whose names match a SQL `LIKE` pattern, optionally restricted to
    /// namespaces matching `namespace_pattern`. Sorted by id.
    fn tables_matching(&self, namespace_pattern: Option<&str>, name_pattern: &str)
    -> Vec<&TableEntry>;

    /// Look up a column by id.
    fn column(&self, id: ColumnId) -> FederaResult<&ColumnEntry>;

    /// Look up a store by id.
    fn store(&self, id: StoreId) -> FederaResult<&StoreEntry>;

    /// All stores, sorted by id.
    fn stores(&self) -> Vec<&StoreEntry>;

    /// Look up a partition group by id.
    fn partition_group(&self, id: PartitionGroupId) -> FederaResult<&PartitionGroup>;

    /// All placements holding data of `column`, sorted.
    fn placements_for_column(&self, column: ColumnId) -> Vec<Placement>;

    /// Physical location of `column` on `store`, if the store holds it.
    fn column_placement(&self, store: StoreId, column: ColumnId) -> Option<&ColumnPlacement>;

    /// Columns of a table in positional order.
    fn columns(&self, table: TableId) -> FederaResult<Vec<&ColumnEntry>> {
        self.table(table)?
            .columns
            .iter()
            .map(|c| self.column(*c))
            .collect()
    }

    /// Look up a column of `table` by name.
    fn column_by_name(&self, table: TableId, name: &str) -> FederaResult<&ColumnEntry> {
        self.columns(table)?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                FederaError::catalog(format!("column '{name}' does not exist in table {table}"))
            })
    }

    /// Row type of a table.
    fn row_type(&self, table: TableId) -> FederaResult<RowType> {
        Ok(row_type_of(&self.columns(table)?))
    }

    /// Partition groups of a table in routing order.
    fn partition_groups(&self, table: TableId) -> FederaResult<Vec<&PartitionGroup>> {
        self.table(table)?
            .partition_groups
            .iter()
            .map(|g| self.partition_group(*g))
            .collect()
    }

    /// Partition function of a table, if partitioned.
    fn partitioning(&self, table: TableId) -> FederaResult<Option<&PartitionProperty>> {
        Ok(self.table(table)?.partitioning.as_ref())
    }

    /// All placements of a table's columns.
    fn placements_for_table(&self, table: TableId) -> FederaResult<Vec<Placement>> {
        Ok(self
            .table(table)?
            .columns
            .iter()
            .flat_map(|c| self.placements_for_column(*c))
            .collect())
    }

    /// Whether `store` holds every column of every partition group of `table`.
    fn store_holds_table(&self, store: StoreId, table: TableId) -> FederaResult<bool> {
        let entry = self.table(table)?;
        Ok(entry.columns.iter().all(|column| {
            let placements = self.placements_for_column(*column);
            entry.partition_groups.iter().all(|group| {
                placements
                    .iter()
                    .any(|p| p.store_id == store && p.partition_group_id == *group)
            })
        }))
    }

    /// Stores holding a complete copy of `table`, sorted by id.
    fn full_stores_for_table(&self, table: TableId) -> FederaResult<Vec<&StoreEntry>> {
        let mut result = Vec::new();
        for store in self.stores() {
            if self.store_holds_table(store.id, table)? {
                result.push(store);
            }
        }
        Ok(result)
    }

    /// Stores of the given backend kind, sorted by id.
    fn stores_of_kind(&self, kind: BackendKind) -> Vec<&StoreEntry> {
        self.stores().into_iter().filter(|s| s.kind == kind).collect()
    }
}

/// DDL-time mutators.
///
/// Every successful call atomically publishes a new catalog version; readers
/// obtained earlier keep observing their own snapshot.
pub trait CatalogWriter: Send + Sync {
    /// Reader over the latest published state.
    fn reader(&self) -> FederaResult<Arc<dyn CatalogReader>>;

    /// Register a store.
    fn add_store(&self, name: &str, kind: BackendKind) -> FederaResult<StoreId>;

    /// Create a table; it starts unpartitioned with a single partition group.
    fn create_table(&self, def: crate::TableDef) -> FederaResult<TableId>;

    /// Create a partition group for `table`.
    ///
    /// The group is not routed to until it is listed in
    /// [`partition_table`](Self::partition_table).
    fn add_partition_group(
        &self,
        table: TableId,
        name: &str,
        qualifiers: Vec<String>,
        is_unbound: bool,
    ) -> FederaResult<PartitionGroupId>;

    /// Install a partition function and its ordered group list. Groups that
    /// are no longer listed are dropped together with their placements.
    fn partition_table(
        &self,
        table: TableId,
        property: PartitionProperty,
        groups: Vec<PartitionGroupId>,
    ) -> FederaResult<()>;

    /// Record that `store` holds `column` for `group`.
    fn add_placement(
        &self,
        store: StoreId,
        column: ColumnId,
        group: PartitionGroupId,
    ) -> FederaResult<()>;

    /// Set the physical names under which `store` keeps `column`.
    fn update_column_placement_physical_names(
        &self,
        store: StoreId,
        column: ColumnId,
        physical_schema: &str,
        physical_table: &str,
        physical_column: &str,
    ) -> FederaResult<()>;

    /// Remove every placement of `column` on `store`.
    fn delete_column_placement(&self, store: StoreId, column: ColumnId) -> FederaResult<()>;

    /// Remove every placement of `table` on `store`.
    fn delete_data_placement(&self, store: StoreId, table: TableId) -> FederaResult<()>;

    /// Update the row count estimate of a table.
    fn set_row_count(&self, table: TableId, rows: f64) -> FederaResult<()>;
}
