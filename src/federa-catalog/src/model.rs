//! Catalog entries.

use federa_core::{BackendKind, DataType, Field, RowType};
use serde::{Deserialize, Serialize};

use crate::ids::{ColumnId, PartitionGroupId, StoreId, TableId};

/// A deployed backend instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Store id.
    pub id: StoreId,
    /// Unique store name (also the convention suffix, e.g. `WIDE_COLUMN:cass1`).
    pub name: String,
    /// Backend family.
    pub kind: BackendKind,
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    /// Column id.
    pub id: ColumnId,
    /// Owning table.
    pub table_id: TableId,
    /// Column name.
    pub name: String,
    /// Column type.
    pub data_type: DataType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Zero-based position in the table's row type.
    pub position: usize,
}

impl ColumnEntry {
    /// Row-type field for this column.
    pub fn to_field(&self) -> Field {
        Field {
            name: self.name.clone(),
            data_type: self.data_type.clone(),
            nullable: self.nullable,
        }
    }
}

/// How a table's rows are distributed over partition groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionKind {
    /// Rows routed by a hash of the partition column.
    Hash,
    /// Rows routed by membership of the column value in a qualifier list.
    List,
    /// Rows routed by inclusive numeric ranges.
    Range,
}

impl std::fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash => write!(f, "HASH"),
            Self::List => write!(f, "LIST"),
            Self::Range => write!(f, "RANGE"),
        }
    }
}

/// Partitioning scheme of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionProperty {
    /// Partition function.
    pub kind: PartitionKind,
    /// Column whose value selects the group.
    pub column: ColumnId,
}

/// A table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Table id.
    pub id: TableId,
    /// Namespace (schema) name.
    pub namespace: String,
    /// Table name.
    pub name: String,
    /// Columns in positional order.
    pub columns: Vec<ColumnId>,
    /// Columns that together choose the storage partition on a keyed backend.
    pub partition_key: Vec<ColumnId>,
    /// Primary-key columns after the partition key, ordering rows within a
    /// storage partition.
    pub clustering_key: Vec<ColumnId>,
    /// Row count estimate, if statistics exist.
    pub row_count: Option<f64>,
    /// Partition groups in routing order; HASH routing indexes into this list.
    /// An unpartitioned table has exactly one group.
    pub partition_groups: Vec<PartitionGroupId>,
    /// Partition function, if the table is partitioned.
    pub partitioning: Option<PartitionProperty>,
}

impl TableEntry {
    /// Fully qualified name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Primary key: partition key followed by clustering key.
    pub fn primary_key(&self) -> Vec<ColumnId> {
        self.partition_key
            .iter()
            .chain(&self.clustering_key)
            .copied()
            .collect()
    }

    /// Whether the table has a partition function.
    pub fn is_partitioned(&self) -> bool {
        self.partitioning.is_some()
    }
}

/// A partition group: one named subset of a table's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionGroup {
    /// Group id.
    pub id: PartitionGroupId,
    /// Owning table.
    pub table_id: TableId,
    /// Group name.
    pub name: String,
    /// Qualifiers (list members or range bounds); empty for HASH groups.
    pub qualifiers: Vec<String>,
    /// Whether this is the catch-all group for unmatched values.
    pub is_unbound: bool,
}

/// The fact that a store holds one partition group's data for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Placement {
    /// Partition group held.
    pub partition_group_id: PartitionGroupId,
    /// Store holding it.
    pub store_id: StoreId,
    /// Column held.
    pub column_id: ColumnId,
}

/// Physical location of a column on a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPlacement {
    /// Store holding the column.
    pub store_id: StoreId,
    /// Column held.
    pub column_id: ColumnId,
    /// Physical schema / keyspace / database.
    pub physical_schema: Option<String>,
    /// Physical table / collection / index.
    pub physical_table: Option<String>,
    /// Physical column / field name.
    pub physical_column: Option<String>,
}

/// Build a row type from column entries.
pub(crate) fn row_type_of(columns: &[&ColumnEntry]) -> RowType {
    RowType::new(columns.iter().map(|c| c.to_field()).collect())
}
