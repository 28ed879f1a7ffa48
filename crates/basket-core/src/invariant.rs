//! # List Invariant
//!
//! Every key on a list's active set must name a product in that list's
//! catalog:
//!
//! ```text
//! ∀ key ∈ active : key ∈ products
//! ```
//!
//! `set_qty` refuses unknown keys, `delete_product` cascades into the
//! active set, and loading repairs whatever slipped through on disk.
//! The helpers here are generic over the value types so they work on both
//! typed maps and raw stored maps.

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};

/// Keys present in `active` but missing from `products`, in key order.
pub fn orphaned_keys<P, A>(products: &BTreeMap<String, P>, active: &BTreeMap<String, A>) -> Vec<String> {
    active
        .keys()
        .filter(|key| !products.contains_key(*key))
        .cloned()
        .collect()
}

/// Fails with the first orphaned key, if any.
pub fn check_invariant<P, A>(products: &BTreeMap<String, P>, active: &BTreeMap<String, A>) -> CoreResult<()> {
    match orphaned_keys(products, active).into_iter().next() {
        Some(key) => Err(CoreError::OrphanedActiveItem { key }),
        None => Ok(()),
    }
}
