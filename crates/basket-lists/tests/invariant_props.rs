//! Property tests: random add / delete / set_qty sequences over two lists.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use basket_core::invariant::check_invariant;
use basket_core::NewProduct;
use basket_lists::{ListError, ListManager};
use basket_store::MemoryStore;
use proptest::prelude::*;

const LISTS: [&str; 2] = ["groceries", "hardware"];

#[derive(Debug, Clone)]
enum Op {
    Add(usize, String),
    Delete(usize, String),
    SetQty(usize, String, i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..2usize, "[a-d]").prop_map(|(list, key)| Op::Add(list, key)),
        (0..2usize, "[a-d]").prop_map(|(list, key)| Op::Delete(list, key)),
        (0..2usize, "[a-d]", -1i64..4).prop_map(|(list, key, qty)| Op::SetQty(list, key, qty)),
    ]
}

#[derive(Default)]
struct Model {
    products: BTreeSet<String>,
    active: BTreeMap<String, u32>,
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariant_holds_for_any_sequence(ops in proptest::collection::vec(op(), 0..40)) {
        runtime().block_on(async {
            let backend = Arc::new(MemoryStore::new());
            let manager = ListManager::new(backend.clone());
            let mut models = [Model::default(), Model::default()];

            for op in &ops {
                match op {
                    Op::Add(list, key) => {
                        manager
                            .add_or_update_product(LISTS[*list], NewProduct::new(key.clone(), key.clone()))
                            .await
                            .unwrap();
                        models[*list].products.insert(key.clone());
                    }
                    Op::Delete(list, key) => {
                        let deleted = manager.delete_product(LISTS[*list], key).await.unwrap();
                        let model = &mut models[*list];
                        assert_eq!(deleted, model.products.remove(key));
                        model.active.remove(key);
                    }
                    Op::SetQty(list, key, qty) => {
                        let result = manager.set_quantity(LISTS[*list], key, *qty).await;
                        let model = &mut models[*list];
                        if *qty < 0 {
                            assert!(matches!(result, Err(ListError::Validation(_))));
                        } else if !model.products.contains(key) {
                            assert!(matches!(result, Err(ListError::InvariantViolation { .. })));
                        } else {
                            assert!(result.is_ok());
                            if *qty == 0 {
                                model.active.remove(key);
                            } else {
                                model.active.insert(key.clone(), *qty as u32);
                            }
                        }
                    }
                }

                for (i, list) in LISTS.iter().enumerate() {
                    let products = manager.get_products(list).await.unwrap();
                    let active = manager.get_active(list).await.unwrap();
                    assert!(check_invariant(&products, &active).is_ok());

                    let keys: BTreeSet<String> = products.keys().cloned().collect();
                    assert_eq!(keys, models[i].products);
                    let quantities: BTreeMap<String, u32> =
                        active.iter().map(|(k, item)| (k.clone(), item.qty)).collect();
                    assert_eq!(quantities, models[i].active);
                }
            }

            // A fresh manager over the same storage sees the same lists.
            let reloaded = ListManager::new(backend);
            for list in LISTS {
                assert_eq!(
                    reloaded.get_products(list).await.unwrap(),
                    manager.get_products(list).await.unwrap()
                );
                assert_eq!(
                    reloaded.get_active(list).await.unwrap(),
                    manager.get_active(list).await.unwrap()
                );
            }
        });
    }
}
