//! Catalog collaborator for Federa.
//!
//! The planner and the partition router never own catalog state; they consume
//! it through two seams:
//!
//! - [`CatalogReader`]: pure lookups against one consistent snapshot
//! - [`CatalogWriter`]: DDL-time mutators, each producing a new snapshot
//!
//! [`InMemoryCatalog`] implements both with copy-on-write snapshots, so a
//! planning run that holds an `Arc<CatalogSnapshot>` never observes a
//! concurrent DDL statement half-applied.

mod def;
mod ids;
mod memory;
mod model;
mod reader;

pub use def::{ColumnDef, TableDef};
pub use ids::{ColumnId, PartitionGroupId, StoreId, TableId};
pub use memory::{CatalogSnapshot, InMemoryCatalog};
pub use model::{
    ColumnEntry, ColumnPlacement, PartitionGroup, PartitionKind, PartitionProperty, Placement,
    StoreEntry, TableEntry,
};
pub use reader::{CatalogReader, CatalogWriter};
