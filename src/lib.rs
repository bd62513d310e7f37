//! Federa - federated query-processing core
//!
//! Federa plans queries over tables spread across heterogeneous stores
//! (document, wide-column, search and file backends). A logical plan is
//! rewritten by a rule engine over a memo of equivalent nodes, predicates
//! and other operators are pushed into each store's native query language
//! where its capabilities allow, and the cheapest plan under the cost model
//! is extracted. Partition routing decides which store holds which rows.
//!
//! ```
//! use federa::adapters::register_all_stores;
//! use federa::catalog::{CatalogReader, CatalogWriter, InMemoryCatalog, TableDef};
//! use federa::config::OptimizerSettings;
//! use federa::core::{BackendKind, DataType};
//! use federa::logical::{PlanBuilder, lit};
//! use federa::optimizer::{Optimizer, RuleRegistry};
//!
//! let catalog = InMemoryCatalog::new();
//! let store = catalog.add_store("docs", BackendKind::Document).unwrap();
//! let table = catalog
//!     .create_table(
//!         TableDef::new("shop", "orders")
//!             .column("id", DataType::Int64, false)
//!             .column("amount", DataType::Float64, true),
//!     )
//!     .unwrap();
//! let reader = catalog.reader().unwrap();
//! let entry = reader.table(table).unwrap();
//! for column in &entry.columns {
//!     for group in &entry.partition_groups {
//!         catalog.add_placement(store, *column, *group).unwrap();
//!     }
//! }
//!
//! let reader = catalog.reader().unwrap();
//! let plan = PlanBuilder::scan(reader.as_ref(), "shop", "orders")
//!     .unwrap()
//!     .filter_by(|b| Ok(b.field("amount")?.gt(lit(100.0))))
//!     .unwrap()
//!     .build();
//!
//! let mut registry = RuleRegistry::with_defaults();
//! register_all_stores(&mut registry, &reader, &OptimizerSettings::default()).unwrap();
//! let optimized = Optimizer::new(registry).optimize(&plan).unwrap();
//! println!("{}", optimized.plan.explain().unwrap());
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub use common_config as config;
pub use common_error as error;
pub use federa_adapters as adapters;
pub use federa_catalog as catalog;
pub use federa_core as core;
pub use federa_logical as logical;
pub use federa_optimizer as optimizer;
pub use federa_partition as partition;

/// Federa version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
