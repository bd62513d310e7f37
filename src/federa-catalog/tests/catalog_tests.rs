//! Integration tests for federa-catalog

use std::sync::Arc;
use std::thread;

use federa_catalog::*;
use federa_core::{BackendKind, DataType};

fn setup() -> (InMemoryCatalog, TableId, StoreId) {
    let catalog = InMemoryCatalog::new();
    let store = catalog.add_store("mongo1", BackendKind::Document).unwrap();
    let table = catalog
        .create_table(
            TableDef::new("public", "customers")
                .column("id", DataType::Int64, false)
                .column("country", DataType::String, true)
                .partition_key(["id"])
                .row_count(1_000.0),
        )
        .unwrap();
    (catalog, table, store)
}

#[test]
fn test_physical_names_follow_placement() {
    let (catalog, table, store) = setup();
    let reader = catalog.reader().unwrap();
    let column = reader.column_by_name(table, "country").unwrap().id;
    let group = reader.table(table).unwrap().partition_groups[0];

    assert!(
        catalog
            .update_column_placement_physical_names(store, column, "db", "coll", "cty")
            .is_err()
    );

    catalog.add_placement(store, column, group).unwrap();
    catalog
        .update_column_placement_physical_names(store, column, "db", "coll", "cty")
        .unwrap();

    let reader = catalog.reader().unwrap();
    let placement = reader.column_placement(store, column).unwrap();
    assert_eq!(placement.physical_table.as_deref(), Some("coll"));
    assert_eq!(placement.physical_column.as_deref(), Some("cty"));

    catalog.delete_column_placement(store, column).unwrap();
    let reader = catalog.reader().unwrap();
    assert!(reader.column_placement(store, column).is_none());
    assert!(reader.placements_for_column(column).is_empty());
}

#[test]
fn test_reader_is_a_stable_snapshot() {
    let (catalog, table, _) = setup();
    let reader = catalog.reader().unwrap();
    let version = reader.version();
    catalog.set_row_count(table, 10.0).unwrap();
    assert_eq!(reader.version(), version);
    assert_eq!(reader.table(table).unwrap().row_count, Some(1_000.0));
    assert!(catalog.reader().unwrap().version() > version);
}

#[test]
fn test_concurrent_writers_serialize() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || {
                catalog
                    .add_store(&format!("store{i}"), BackendKind::File)
                    .unwrap()
            })
        })
        .collect();
    let mut ids: Vec<StoreId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    let reader = catalog.reader().unwrap();
    assert_eq!(reader.stores().len(), 8);
    assert_eq!(reader.version(), 8);
    assert_eq!(reader.stores_of_kind(BackendKind::File).len(), 8);
}

#[test]
fn test_lookup_errors_are_catalog_errors() {
    let (catalog, _, _) = setup();
    let reader = catalog.reader().unwrap();
    let err = reader.table_by_name("public", "missing").unwrap_err();
    assert!(err.to_string().starts_with("CatalogError:"));
    assert!(reader.table(TableId(999)).is_err());
}

#[test]
fn test_table_entry_serialization() {
    let (catalog, table, _) = setup();
    let reader = catalog.reader().unwrap();
    let entry = reader.table(table).unwrap();
    let json = serde_json::to_string(entry).unwrap();
    let restored: TableEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(&restored, entry);
    assert_eq!(restored.qualified_name(), "public.customers");
}
