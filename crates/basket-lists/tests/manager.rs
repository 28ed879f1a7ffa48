//! End-to-end behaviour of `ListManager` over in-memory and on-disk stores.

use std::sync::Arc;

use basket_core::invariant::check_invariant;
use basket_core::{ActiveItem, NewProduct};
use basket_lists::{ListError, ListManager, NewList};
use basket_store::{BlobStore, JsonFileStore, MemoryStore, SqliteConfig, SqliteStore, StoreError};
use serde_json::json;

fn memory_manager() -> (Arc<MemoryStore>, ListManager) {
    let backend = Arc::new(MemoryStore::new());
    let manager = ListManager::new(backend.clone());
    (backend, manager)
}

async fn add(manager: &ListManager, list_id: &str, key: &str) {
    manager
        .add_or_update_product(list_id, NewProduct::new(key, key.to_uppercase()))
        .await
        .unwrap();
}

#[tokio::test]
async fn set_qty_for_unknown_product_is_rejected() {
    let (_backend, manager) = memory_manager();

    let err = manager.set_quantity("groceries", "ghost", 3).await.unwrap_err();
    match err {
        ListError::InvariantViolation { list_id, key } => {
            assert_eq!(list_id, "groceries");
            assert_eq!(key, "ghost");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(!manager.get_active("groceries").await.unwrap().contains_key("ghost"));
}

#[tokio::test]
async fn zero_quantity_removes_entry() {
    let (_backend, manager) = memory_manager();
    add(&manager, "groceries", "milk").await;

    manager.set_quantity("groceries", "milk", 2).await.unwrap();
    assert_eq!(
        manager.get_active("groceries").await.unwrap()["milk"],
        ActiveItem { qty: 2 }
    );

    manager.set_quantity("groceries", "milk", 0).await.unwrap();
    assert!(manager.get_active("groceries").await.unwrap().is_empty());

    // Zero on an item that isn't active is still fine.
    manager.set_quantity("groceries", "milk", 0).await.unwrap();
}

#[tokio::test]
async fn delete_cascades_and_repeats_as_no_op() {
    let (_backend, manager) = memory_manager();
    add(&manager, "groceries", "milk").await;
    manager.set_quantity("groceries", "milk", 2).await.unwrap();

    assert!(manager.delete_product("groceries", "milk").await.unwrap());
    assert!(manager.get_products("groceries").await.unwrap().is_empty());
    assert!(manager.get_active("groceries").await.unwrap().is_empty());

    assert!(!manager.delete_product("groceries", "milk").await.unwrap());
}

#[tokio::test]
async fn orphans_are_repaired_on_load() {
    let backend = Arc::new(MemoryStore::new());
    backend
        .insert(
            "shopping_list_manager.products",
            json!({"milk": {"key": "milk", "name": "Milk", "category": "dairy", "unit": "L", "image": ""}}),
        )
        .await;
    backend
        .insert(
            "shopping_list_manager.active_list",
            json!({"milk": {"qty": 2}, "bread": {"qty": 1}}),
        )
        .await;

    let manager = ListManager::new(backend.clone());
    let active = manager.get_active("groceries").await.unwrap();

    assert_eq!(active.len(), 1);
    assert_eq!(active["milk"].qty, 2);
    assert_eq!(
        backend.get("shopping_list_manager.active_list").await.unwrap(),
        json!({"milk": {"qty": 2}})
    );
}

#[tokio::test]
async fn clean_load_does_not_rewrite_active() {
    let backend = Arc::new(MemoryStore::new());
    backend
        .insert("shopping_list_manager.products", json!({"milk": {"key": "milk", "name": "Milk"}}))
        .await;
    backend
        .insert("shopping_list_manager.active_list", json!({"milk": {"qty": 1}}))
        .await;

    let manager = ListManager::new(backend.clone());
    manager.preload().await.unwrap();

    // Only the two registry bootstraps were written.
    assert_eq!(backend.save_count(), 2);
}

#[tokio::test]
async fn upsert_is_idempotent_and_keeps_quantity() {
    let (backend, manager) = memory_manager();

    let first = manager
        .add_or_update_product("groceries", NewProduct::new("eggs", "Eggs").with_unit("dozen"))
        .await
        .unwrap();
    manager.set_quantity("groceries", "eggs", 1).await.unwrap();

    let products_after_first = backend.get("shopping_list_manager.products").await;
    let second = manager
        .add_or_update_product("groceries", NewProduct::new("eggs", "Eggs").with_unit("dozen"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.get("shopping_list_manager.products").await, products_after_first);
    assert_eq!(manager.get_products("groceries").await.unwrap().len(), 1);
    assert_eq!(manager.get_active("groceries").await.unwrap()["eggs"].qty, 1);

    let renamed = manager
        .add_or_update_product("groceries", NewProduct::new("eggs", "Free-range eggs"))
        .await
        .unwrap();
    assert_eq!(renamed.unit, "pcs");
    assert_eq!(manager.get_products("groceries").await.unwrap()["eggs"].name, "Free-range eggs");
}

#[tokio::test]
async fn lists_are_isolated() {
    let (_backend, manager) = memory_manager();

    add(&manager, "groceries", "milk").await;
    add(&manager, "hardware", "nails").await;
    manager.set_quantity("hardware", "nails", 100).await.unwrap();

    assert!(manager.set_quantity("groceries", "nails", 1).await.is_err());
    assert!(manager.get_active("groceries").await.unwrap().is_empty());

    manager.delete_product("hardware", "milk").await.unwrap();
    assert!(manager.get_products("groceries").await.unwrap().contains_key("milk"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lists_stay_independent() {
    let (_backend, manager) = memory_manager();
    let manager = Arc::new(manager);

    let mut handles = Vec::new();
    for list in ["groceries", "hardware", "pharmacy", "garden"] {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..20 {
                let key = format!("{list}-{i}");
                manager
                    .add_or_update_product(list, NewProduct::new(key.clone(), key.clone()))
                    .await
                    .unwrap();
                manager.set_quantity(list, &key, i + 1).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for list in ["groceries", "hardware", "pharmacy", "garden"] {
        let products = manager.get_products(list).await.unwrap();
        let active = manager.get_active(list).await.unwrap();
        assert_eq!(products.len(), 20);
        assert_eq!(active.len(), 20);
        assert!(products.keys().all(|k| k.starts_with(list)));
        assert!(check_invariant(&products, &active).is_ok());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_list_keeps_invariant() {
    let (backend, manager) = memory_manager();
    let manager = Arc::new(manager);
    add(&manager, "groceries", "milk").await;

    let mut handles = Vec::new();
    for task in 0..8i64 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..10 {
                let _ = manager.set_quantity("groceries", "milk", task + 1).await;
                if task % 4 == 0 {
                    let _ = manager.delete_product("groceries", "milk").await;
                } else {
                    add(&manager, "groceries", "milk").await;
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let products = manager.get_products("groceries").await.unwrap();
    let active = manager.get_active("groceries").await.unwrap();
    assert!(check_invariant(&products, &active).is_ok());

    // What was persisted matches what is in memory.
    let stored_active = backend.get("shopping_list_manager.active_list").await.unwrap();
    assert_eq!(stored_active, serde_json::to_value(&active).unwrap());
}

#[tokio::test]
async fn persistence_failures_propagate() {
    let (backend, manager) = memory_manager();
    manager.preload().await.unwrap();

    backend.set_fail_saves(true);
    let err = manager
        .add_or_update_product("groceries", NewProduct::new("milk", "Milk"))
        .await
        .unwrap_err();
    assert!(matches!(err, ListError::Store(StoreError::Unavailable(_))));
}

#[tokio::test]
async fn state_survives_restart_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("basket.db");

    {
        let store = SqliteStore::new(SqliteConfig::new(&path)).await.unwrap();
        let manager = ListManager::new(Arc::new(store.clone()));
        add(&manager, "groceries", "milk").await;
        manager.set_quantity("groceries", "milk", 3).await.unwrap();
        store.close().await;
    }

    let store = SqliteStore::new(SqliteConfig::new(&path)).await.unwrap();
    let manager = ListManager::new(Arc::new(store));
    assert_eq!(manager.get_active("groceries").await.unwrap()["milk"].qty, 3);
}

#[tokio::test]
async fn reads_existing_storage_directory() {
    let dir = tempfile::tempdir().unwrap();
    let write = |key: &str, data: serde_json::Value| {
        let envelope = json!({"version": 2, "minor_version": 1, "key": key, "data": data});
        std::fs::write(dir.path().join(key), envelope.to_string()).unwrap();
    };
    write(
        "shopping_list_manager.products",
        json!({"bread": {"key": "bread", "name": "Bread", "category": "bakery", "unit": "loaf", "image": ""}}),
    );
    write("shopping_list_manager.active_list", json!({"bread": {"qty": 1}}));

    let backend: Arc<dyn BlobStore> = Arc::new(JsonFileStore::new(dir.path()));
    let manager = ListManager::new(backend);

    let products = manager.get_products("groceries").await.unwrap();
    assert_eq!(products["bread"].unit, "loaf");
    assert_eq!(manager.get_active("groceries").await.unwrap()["bread"].qty, 1);

    // Registries were bootstrapped next to the existing data.
    assert!(dir.path().join("shopping_list_manager.lists").exists());
    assert!(dir.path().join("shopping_list_manager.catalogues").exists());
}

async fn list_on_groceries(manager: &ListManager, name: &str) -> String {
    let input = NewList {
        catalogue: Some("groceries".to_string()),
        ..NewList::named(name)
    };
    manager.create_list("alice", input).await.unwrap().0
}

#[tokio::test]
async fn lists_sharing_a_catalogue_share_products() {
    let (backend, manager) = memory_manager();
    add(&manager, "groceries", "milk").await;

    let weekend = list_on_groceries(&manager, "Weekend").await;
    assert!(manager.get_products(&weekend).await.unwrap().contains_key("milk"));

    add(&manager, "groceries", "eggs").await;
    add(&manager, &weekend, "bread").await;

    let stored = backend.get("shopping_list_manager.products").await.unwrap();
    let mut keys: Vec<_> = stored.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, ["bread", "eggs", "milk"]);

    let restarted = ListManager::new(backend.clone());
    assert_eq!(restarted.get_products("groceries").await.unwrap().len(), 3);
}

#[tokio::test]
async fn delete_through_one_list_clears_the_other() {
    let (backend, manager) = memory_manager();
    add(&manager, "groceries", "eggs").await;
    let weekend = list_on_groceries(&manager, "Weekend").await;

    manager.set_quantity("groceries", "eggs", 1).await.unwrap();
    manager.set_quantity(&weekend, "eggs", 12).await.unwrap();

    assert!(manager.delete_product("groceries", "eggs").await.unwrap());

    assert!(manager.get_active(&weekend).await.unwrap().is_empty());
    let key = format!("shopping_list_manager.{weekend}.active_list");
    assert_eq!(backend.get(&key).await.unwrap(), json!({}));

    let err = manager.set_quantity(&weekend, "eggs", 1).await.unwrap_err();
    assert!(matches!(err, ListError::InvariantViolation { .. }));
    assert!(!manager.delete_product(&weekend, "eggs").await.unwrap());
}

#[tokio::test]
async fn unloaded_sibling_drops_deleted_product_on_load() {
    let (backend, manager) = memory_manager();
    add(&manager, "groceries", "eggs").await;
    let weekend = list_on_groceries(&manager, "Weekend").await;
    manager.set_quantity(&weekend, "eggs", 6).await.unwrap();

    // A fresh manager only loads groceries before the delete.
    let restarted = ListManager::new(backend.clone());
    assert!(restarted.delete_product("groceries", "eggs").await.unwrap());

    assert!(restarted.get_active(&weekend).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_through_shared_catalogue_all_persist() {
    let (backend, manager) = memory_manager();
    let manager = Arc::new(manager);
    let weekend = list_on_groceries(&manager, "Weekend").await;

    let mut handles = Vec::new();
    for list in ["groceries".to_string(), weekend.clone()] {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..15 {
                let key = format!("{}-{i}", &list[..4]);
                add(&manager, &list, &key).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = backend.get("shopping_list_manager.products").await.unwrap();
    assert_eq!(stored.as_object().unwrap().len(), 30);
    assert_eq!(manager.get_products(&weekend).await.unwrap().len(), 30);
}

#[tokio::test]
async fn failed_registration_is_persisted_on_retry() {
    let (backend, manager) = memory_manager();
    manager.preload().await.unwrap();

    backend.set_fail_saves(true);
    assert!(manager.get_products("pantry").await.is_err());

    backend.set_fail_saves(false);
    manager.get_products("pantry").await.unwrap();

    let lists = backend.get("shopping_list_manager.lists").await.unwrap();
    assert_eq!(lists["pantry"]["owner"], "system");
}

#[tokio::test]
async fn failed_create_list_leaves_registries_unchanged() {
    let (backend, manager) = memory_manager();
    manager.preload().await.unwrap();

    backend.set_fail_saves(true);
    assert!(manager.create_list("alice", NewList::named("Pantry")).await.is_err());
    backend.set_fail_saves(false);

    assert_eq!(manager.get_lists().await.unwrap().len(), 1);
    assert_eq!(manager.get_catalogues().await.unwrap().len(), 1);
}

#[tokio::test]
async fn legacy_list_ids_with_spaces_and_dots_work() {
    let backend = Arc::new(MemoryStore::new());
    backend
        .insert(
            "shopping_list_manager.lists",
            json!({"Weekend Trip": {"catalogue": "Weekend Trip"}, "v1.pantry": {"catalogue": "v1.pantry"}}),
        )
        .await;
    let manager = ListManager::new(backend.clone());

    for list_id in ["Weekend Trip", "v1.pantry"] {
        add(&manager, list_id, "rice").await;
        manager.set_quantity(list_id, "rice", 2).await.unwrap();
        assert_eq!(manager.get_active(list_id).await.unwrap()["rice"].qty, 2);
    }

    assert!(backend
        .get("shopping_list_manager.Weekend Trip.products")
        .await
        .is_some());
}
