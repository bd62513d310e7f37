//! Families of storage backends a plan subtree can be pushed to.

use serde::{Deserialize, Serialize};

/// Kind of storage backend.
///
/// Each kind has its own native query language and its own pushdown
/// capabilities; several stores of the same kind may be deployed at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendKind {
    /// Document store (JSON documents, `$match`-style filters).
    Document,
    /// Wide-column store (partition key + clustering columns, CQL).
    WideColumn,
    /// Search index (`bool` queries).
    Search,
    /// File store (one file per row, addressed by primary key).
    File,
}

impl BackendKind {
    /// All backend kinds.
    pub const ALL: [Self; 4] = [Self::Document, Self::WideColumn, Self::Search, Self::File];

    /// Stable upper-case name, used as configuration key and convention prefix.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Document => "DOCUMENT",
            Self::WideColumn => "WIDE_COLUMN",
            Self::Search => "SEARCH",
            Self::File => "FILE",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
