//! Typed catalog identifiers.

use serde::{Deserialize, Serialize};

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

catalog_id!(
    /// Identifier of a table.
    TableId,
    "t"
);
catalog_id!(
    /// Identifier of a column.
    ColumnId,
    "c"
);
catalog_id!(
    /// Identifier of a store (one deployed backend instance).
    StoreId,
    "s"
);
catalog_id!(
    /// Identifier of a partition group.
    PartitionGroupId,
    "pg"
);
