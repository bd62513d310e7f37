//! Table definitions handed to [`CatalogWriter::create_table`](crate::CatalogWriter::create_table).

use federa_core::DataType;

/// Column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// Builder for a new table.
///
/// ```
/// use federa_catalog::TableDef;
/// use federa_core::DataType;
///
/// let def = TableDef::new("shop", "orders")
///     .column("customer", DataType::String, false)
///     .column("id", DataType::Int64, false)
///     .column("amount", DataType::Float64, true)
///     .partition_key(["customer"])
///     .clustering_key(["id"]);
/// assert_eq!(def.columns.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub namespace: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub partition_key: Vec<String>,
    pub clustering_key: Vec<String>,
    pub row_count: Option<f64>,
}

impl TableDef {
    /// Start a definition with no columns.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            columns: Vec::new(),
            partition_key: Vec::new(),
            clustering_key: Vec::new(),
            row_count: None,
        }
    }

    /// Append a column.
    pub fn column(mut self, name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            data_type,
            nullable,
        });
        self
    }

    /// Set the partition key by column name.
    pub fn partition_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the clustering key by column name.
    pub fn clustering_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clustering_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the row count estimate.
    pub fn row_count(mut self, rows: f64) -> Self {
        self.row_count = Some(rows);
        self
    }
}
