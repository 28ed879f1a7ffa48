//! # List Manager
//!
//! Owns every catalogue's products and every list's active set, and is the
//! only code that mutates them.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ListManager                                      │
//! │                                                                         │
//! │  registry: tokio Mutex<Registry>   (catalogues + lists)                │
//! │         list_id ──► products store key                                 │
//! │                                                                         │
//! │  slots: std Mutex<HashMap<products_key, Arc<tokio Mutex<Slot>>>>       │
//! │         (get-or-insert only, never held across .await)                 │
//! │                                                                         │
//! │   ".products"          ──► Mutex ──► { products,                       │
//! │                                        groceries → active,             │
//! │                                        weekend   → active }            │
//! │   ".hardware.products" ──► Mutex ──► { products, hardware → active }   │
//! │                                                                         │
//! │  The registry lock is released before a catalogue lock is taken.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lists that share a catalogue share one products map under one lock, so
//! a write through either list sees the other's changes. State lives
//! *inside* the mutex and the lock stays held across the storage write;
//! tokio's mutex hands it out in FIFO order, so two operations on the same
//! catalogue always apply in arrival order. Lists on different catalogues
//! only meet briefly on the registry lock while their catalogue is resolved.
//!
//! ## Operation Flow
//! ```text
//! validate input (no lock)
//!      │
//!      ▼
//! resolve list → catalogue (registry lock, registers unknown lists)
//!      │
//!      ▼
//! lock catalogue ──► load products ──► load list's active ──► mutate ──► save ──► unlock ──► notify
//!                                            │
//!                                            └─ first touch: drop invalid and orphaned entries
//! ```

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use basket_core::invariant::{check_invariant, orphaned_keys};
use basket_core::validation::{validate_list_id, validate_list_name, validate_quantity};
use basket_core::{
    epoch_now, ActiveItem, Catalogue, ListMeta, NewProduct, Product, User, Visibility,
    DEFAULT_LIST_ICON, DEFAULT_LIST_ID,
};
use basket_store::{BlobStore, StorageLayout, Store, StoreError};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ListError, ListResult};
use crate::events::{ChangeNotifier, ListChanged};
use crate::registry::Registry;

// =============================================================================
// Per-Catalogue State
// =============================================================================

#[derive(Debug, Default)]
struct CatalogueSlot {
    /// `None` until a list on this catalogue is first touched.
    state: Option<CatalogueState>,
}

#[derive(Debug)]
struct CatalogueState {
    products: BTreeMap<String, Product>,
    products_store: Store,
    /// Active sets of the lists on this catalogue loaded so far.
    lists: HashMap<String, ActiveSet>,
}

impl CatalogueState {
    async fn save_products(&self) -> ListResult<()> {
        self.products_store.save(&self.products).await?;
        Ok(())
    }

    fn debug_check(&self) {
        for set in self.lists.values() {
            debug_assert!(check_invariant(&self.products, &set.items).is_ok());
        }
    }
}

#[derive(Debug)]
struct ActiveSet {
    items: BTreeMap<String, ActiveItem>,
    store: Store,
}

impl ActiveSet {
    async fn save(&self) -> ListResult<()> {
        self.store.save(&self.items).await?;
        Ok(())
    }
}

/// One list's window onto its catalogue.
struct ListView<'a> {
    products: &'a BTreeMap<String, Product>,
    active: &'a mut ActiveSet,
}

// =============================================================================
// Create List Input
// =============================================================================

/// Input for [`ListManager::create_list`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewList {
    /// Display name of the new catalogue.
    pub name: String,
    /// Icon of the new catalogue. Defaults to `mdi:cart`.
    #[serde(default)]
    pub icon: Option<String>,
    /// Defaults to shared.
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// Share an existing catalogue instead of creating one.
    #[serde(default)]
    pub catalogue: Option<String>,
}

impl NewList {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// List Manager
// =============================================================================

/// The invariant-enforcing multi-list manager.
///
/// Cheap to share: wrap it in an `Arc` and hand clones to every handler.
#[derive(Debug)]
pub struct ListManager {
    backend: Arc<dyn BlobStore>,
    layout: StorageLayout,
    registry: Mutex<Registry>,
    slots: StdMutex<HashMap<String, Arc<Mutex<CatalogueSlot>>>>,
    notifier: ChangeNotifier,
}

impl ListManager {
    /// Creates a manager over `backend` using the default storage domain.
    pub fn new(backend: Arc<dyn BlobStore>) -> Self {
        Self::with_layout(backend, StorageLayout::default())
    }

    pub fn with_layout(backend: Arc<dyn BlobStore>, layout: StorageLayout) -> Self {
        Self {
            registry: Mutex::new(Registry::new(backend.clone(), layout.clone())),
            backend,
            layout,
            slots: StdMutex::new(HashMap::new()),
            notifier: ChangeNotifier::default(),
        }
    }

    /// Receives one [`ListChanged`] per successful mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<ListChanged> {
        self.notifier.subscribe()
    }

    /// Loads the default list so its first request doesn't pay for it.
    pub async fn preload(&self) -> ListResult<()> {
        let products_key = self.resolve(DEFAULT_LIST_ID).await?;

        let lock = self.lock_for(&products_key);
        let mut slot = lock.lock().await;
        let state = self.ensure_loaded(&products_key, &mut slot).await?;
        self.open_list(DEFAULT_LIST_ID, state).await?;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Products store key of the catalogue behind `list_id`. Registers the
    /// list first if the registry has never seen it.
    async fn resolve(&self, list_id: &str) -> ListResult<String> {
        let mut registry = self.registry.lock().await;
        registry.ensure_loaded().await?;
        registry.register_list(list_id).await?;
        Ok(registry.products_key_for(list_id))
    }

    fn lock_for(&self, products_key: &str) -> Arc<Mutex<CatalogueSlot>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(products_key.to_string()).or_default().clone()
    }

    /// Loads the catalogue's products into `slot` on first use.
    async fn ensure_loaded<'a>(
        &self,
        products_key: &str,
        slot: &'a mut CatalogueSlot,
    ) -> ListResult<&'a mut CatalogueState> {
        let state = match slot.state.take() {
            Some(state) => state,
            None => {
                let products_store = Store::new(self.backend.clone(), products_key);
                let products = decode_products(&products_store).await?;
                info!(store = %products_key, products = products.len(), "Loaded catalogue");

                CatalogueState {
                    products,
                    products_store,
                    lists: HashMap::new(),
                }
            }
        };
        Ok(slot.state.insert(state))
    }

    /// Loads `list_id`'s active set on first use, repairing it against the
    /// catalogue.
    async fn open_list<'a>(&self, list_id: &str, state: &'a mut CatalogueState) -> ListResult<ListView<'a>> {
        let CatalogueState { products, lists, .. } = state;

        let active = match lists.entry(list_id.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let store = Store::new(self.backend.clone(), self.layout.active_key(list_id));
                entry.insert(load_active_set(list_id, store, products).await?)
            }
        };

        Ok(ListView { products, active })
    }

    // =========================================================================
    // Product Operations
    // =========================================================================

    /// Adds a product to the list's catalogue, or replaces it if the key
    /// exists. Never touches quantities.
    pub async fn add_or_update_product(&self, list_id: &str, input: NewProduct) -> ListResult<Product> {
        validate_list_id(list_id)?;
        let product = input.into_product()?;
        let products_key = self.resolve(list_id).await?;

        let lock = self.lock_for(&products_key);
        let mut slot = lock.lock().await;
        let state = self.ensure_loaded(&products_key, &mut slot).await?;

        state.products.insert(product.key.clone(), product.clone());
        state.save_products().await?;
        state.debug_check();

        debug!(list_id = %list_id, key = %product.key, name = %product.name, "Added/updated product");
        drop(slot);

        self.notifier.notify();
        Ok(product)
    }

    /// Sets how many of a product are needed. Zero removes it from the
    /// active set.
    ///
    /// ## Errors
    /// - `Validation` for negative or oversized quantities (no lock taken)
    /// - `InvariantViolation` if the key isn't in the list's catalogue
    pub async fn set_quantity(&self, list_id: &str, key: &str, qty: i64) -> ListResult<()> {
        let qty = validate_quantity(qty)?;
        validate_list_id(list_id)?;
        let products_key = self.resolve(list_id).await?;

        let lock = self.lock_for(&products_key);
        let mut slot = lock.lock().await;
        let state = self.ensure_loaded(&products_key, &mut slot).await?;
        let view = self.open_list(list_id, state).await?;

        if !view.products.contains_key(key) {
            return Err(ListError::InvariantViolation {
                list_id: list_id.to_string(),
                key: key.to_string(),
            });
        }

        match ActiveItem::from_quantity(qty) {
            Some(item) => {
                view.active.items.insert(key.to_string(), item);
                debug!(list_id = %list_id, key = %key, qty, "Set quantity");
            }
            None => {
                if view.active.items.remove(key).is_some() {
                    debug!(list_id = %list_id, key = %key, "Removed from active list");
                }
            }
        }

        view.active.save().await?;
        state.debug_check();
        drop(slot);

        self.notifier.notify();
        Ok(())
    }

    /// Removes a product from the list's catalogue, and its entry from the
    /// active set of every loaded list on that catalogue.
    ///
    /// Deleting an unknown key is a logged no-op that returns `false`.
    pub async fn delete_product(&self, list_id: &str, key: &str) -> ListResult<bool> {
        validate_list_id(list_id)?;
        let products_key = self.resolve(list_id).await?;

        let lock = self.lock_for(&products_key);
        let mut slot = lock.lock().await;
        let state = self.ensure_loaded(&products_key, &mut slot).await?;
        self.open_list(list_id, state).await?;

        if state.products.remove(key).is_none() {
            warn!(list_id = %list_id, key = %key, "Attempted to delete non-existent product");
            return Ok(false);
        }
        state.save_products().await?;

        // Lists on this catalogue that aren't loaded yet drop the entry as
        // an orphan when they are.
        for (id, set) in state.lists.iter_mut() {
            if set.items.remove(key).is_some() {
                set.save().await?;
                debug!(list_id = %id, key = %key, "Removed deleted product from active list");
            }
        }
        state.debug_check();

        debug!(list_id = %list_id, key = %key, "Deleted product");
        drop(slot);

        self.notifier.notify();
        Ok(true)
    }

    /// Bulk upsert used for catalog seeding.
    ///
    /// Invalid entries are skipped. The catalogue is locked once, saved
    /// once and one change event fires. Returns how many products were
    /// written.
    pub async fn import_products(&self, list_id: &str, entries: Vec<NewProduct>) -> ListResult<usize> {
        validate_list_id(list_id)?;

        let mut products = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = entry.key.clone();
            match entry.into_product() {
                Ok(product) => products.push(product),
                Err(e) => warn!(list_id = %list_id, key = %key, error = %e, "Skipping invalid catalog entry"),
            }
        }

        if products.is_empty() {
            return Ok(0);
        }

        let products_key = self.resolve(list_id).await?;
        let lock = self.lock_for(&products_key);
        let mut slot = lock.lock().await;
        let state = self.ensure_loaded(&products_key, &mut slot).await?;

        let count = products.len();
        for product in products {
            state.products.insert(product.key.clone(), product);
        }
        state.save_products().await?;

        info!(list_id = %list_id, count, "Imported products");
        drop(slot);

        self.notifier.notify();
        Ok(count)
    }

    /// Snapshot of the list's catalogue.
    pub async fn get_products(&self, list_id: &str) -> ListResult<BTreeMap<String, Product>> {
        validate_list_id(list_id)?;
        let products_key = self.resolve(list_id).await?;

        let lock = self.lock_for(&products_key);
        let mut slot = lock.lock().await;
        let state = self.ensure_loaded(&products_key, &mut slot).await?;
        Ok(state.products.clone())
    }

    /// Snapshot of the list's active set.
    pub async fn get_active(&self, list_id: &str) -> ListResult<BTreeMap<String, ActiveItem>> {
        validate_list_id(list_id)?;
        let products_key = self.resolve(list_id).await?;

        let lock = self.lock_for(&products_key);
        let mut slot = lock.lock().await;
        let state = self.ensure_loaded(&products_key, &mut slot).await?;
        let view = self.open_list(list_id, state).await?;
        Ok(view.active.items.clone())
    }

    // =========================================================================
    // Registry Operations
    // =========================================================================

    pub async fn get_catalogues(&self) -> ListResult<BTreeMap<String, Catalogue>> {
        let mut registry = self.registry.lock().await;
        registry.ensure_loaded().await?;
        Ok(registry.catalogues().clone())
    }

    pub async fn get_lists(&self) -> ListResult<BTreeMap<String, ListMeta>> {
        let mut registry = self.registry.lock().await;
        registry.ensure_loaded().await?;
        Ok(registry.lists().clone())
    }

    /// Lists `user` may see: all for admins, otherwise shared ones and
    /// the user's own.
    pub async fn get_visible_lists(&self, user: &User) -> ListResult<BTreeMap<String, ListMeta>> {
        let mut registry = self.registry.lock().await;
        registry.ensure_loaded().await?;

        Ok(registry
            .lists()
            .iter()
            .filter(|(_, meta)| user.can_see(meta))
            .map(|(id, meta)| (id.clone(), meta.clone()))
            .collect())
    }

    /// Registers a new list owned by `owner` under a fresh UUID.
    ///
    /// Without `catalogue` a dedicated catalogue named after the list is
    /// created; with it the list shares that catalogue's products.
    pub async fn create_list(&self, owner: &str, input: NewList) -> ListResult<(String, ListMeta)> {
        validate_list_name(&input.name)?;

        let list_id = Uuid::new_v4().to_string();
        let now = epoch_now();

        let mut registry = self.registry.lock().await;
        registry.ensure_loaded().await?;

        let (catalogue_id, catalogue) = match input.catalogue {
            Some(catalogue_id) => {
                if !registry.has_catalogue(&catalogue_id) {
                    return Err(ListError::not_found("Catalogue", catalogue_id));
                }
                (catalogue_id, None)
            }
            None => {
                let catalogue = Catalogue {
                    name: input.name.trim().to_string(),
                    icon: input.icon.unwrap_or_else(|| DEFAULT_LIST_ICON.to_string()),
                    products_store_key: self.layout.products_key(&list_id),
                };
                (list_id.clone(), Some(catalogue))
            }
        };

        let meta = ListMeta {
            catalogue_id,
            owner: owner.to_string(),
            visibility: input.visibility.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        registry.add_list(&list_id, meta.clone(), catalogue).await?;
        drop(registry);

        info!(list_id = %list_id, owner = %owner, catalogue = %meta.catalogue_id, "Created list");
        self.notifier.notify();
        Ok((list_id, meta))
    }
}

// =============================================================================
// Blob Decoding
// =============================================================================

fn expect_object(store: &Store, value: Option<Value>) -> ListResult<serde_json::Map<String, Value>> {
    match value {
        None => Ok(serde_json::Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(StoreError::corrupt(store.key(), "expected a JSON object").into()),
    }
}

/// Reads a products blob. Entries that fail validation are skipped.
async fn decode_products(store: &Store) -> ListResult<BTreeMap<String, Product>> {
    let raw = expect_object(store, store.load().await?)?;

    let mut products = BTreeMap::new();
    for (key, value) in raw {
        let product = serde_json::from_value::<Product>(value)
            .map_err(|e| e.to_string())
            .and_then(|p| p.validate().map(|_| p).map_err(|e| e.to_string()));

        match product {
            Ok(product) => {
                products.insert(key, product);
            }
            Err(reason) => warn!(store = %store.key(), key = %key, reason = %reason, "Dropping invalid stored product"),
        }
    }
    Ok(products)
}

/// Reads an active blob. Returns the items and how many stored entries
/// were dropped for not holding a positive integer quantity.
async fn decode_active(list_id: &str, store: &Store) -> ListResult<(BTreeMap<String, ActiveItem>, usize)> {
    let raw = expect_object(store, store.load().await?)?;

    let mut active = BTreeMap::new();
    let mut dropped = 0;
    for (key, value) in raw {
        match ActiveItem::from_stored(&value) {
            Some(item) => {
                active.insert(key, item);
            }
            None => {
                warn!(list_id = %list_id, key = %key, value = %value, "Dropping invalid active entry");
                dropped += 1;
            }
        }
    }
    Ok((active, dropped))
}

/// Reads a list's active set and removes entries whose product is not in
/// `products`. Writes the set back only if something was dropped.
async fn load_active_set(
    list_id: &str,
    store: Store,
    products: &BTreeMap<String, Product>,
) -> ListResult<ActiveSet> {
    let (mut items, mut dropped) = decode_active(list_id, &store).await?;

    let orphaned = orphaned_keys(products, &items);
    if !orphaned.is_empty() {
        warn!(
            list_id = %list_id,
            count = orphaned.len(),
            keys = ?orphaned,
            "Removing orphaned active items"
        );
        for key in &orphaned {
            items.remove(key);
        }
        dropped += orphaned.len();
    }

    let set = ActiveSet { items, store };
    if dropped > 0 {
        set.save().await?;
    }

    info!(list_id = %list_id, active = set.items.len(), "Loaded list");
    Ok(set)
}

// =============================================================================
// Unit Tests
// =============================================================================
