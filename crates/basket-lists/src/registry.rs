//! # Catalogue and List Registries
//!
//! Two process-wide maps, loaded once and kept in memory:
//!
//! ```text
//! <domain>.catalogues   catalogue_id → { name, icon, products_store }
//! <domain>.lists        list_id      → { catalogue, owner, visibility,
//!                                        created_at, updated_at }
//! ```
//!
//! ## First Load
//! ```text
//! catalogues blob ── object? ──yes──► use as-is
//!                      │no/absent
//!                      ▼
//!               { groceries → <domain>.products }  ──► save
//!
//! lists blob ─────── object? ──yes──► fill missing owner/visibility/
//!                      │no/absent       timestamps ──► save if changed
//!                      ▼
//!               { groceries → system, shared }     ──► save
//! ```
//!
//! The registry lives behind the manager's registry mutex, which is never
//! held together with a catalogue lock. Writes save a copy of the map and
//! only then replace the in-memory one.

use std::collections::BTreeMap;
use std::sync::Arc;

use basket_core::{epoch_now, Catalogue, ListMeta, DEFAULT_LIST_ID};
use basket_store::{BlobStore, StorageLayout, Store};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ListResult;

const DEFAULT_CATALOGUE_NAME: &str = "Groceries";
const DEFAULT_CATALOGUE_ICON: &str = "🛒";

#[derive(Debug)]
pub(crate) struct Registry {
    catalogues: BTreeMap<String, Catalogue>,
    lists: BTreeMap<String, ListMeta>,
    catalogues_store: Store,
    lists_store: Store,
    layout: StorageLayout,
    loaded: bool,
}

impl Registry {
    pub(crate) fn new(backend: Arc<dyn BlobStore>, layout: StorageLayout) -> Self {
        Self {
            catalogues: BTreeMap::new(),
            lists: BTreeMap::new(),
            catalogues_store: Store::new(backend.clone(), layout.catalogues_key()),
            lists_store: Store::new(backend, layout.lists_key()),
            layout,
            loaded: false,
        }
    }

    /// Loads both registries on first call. A failed load leaves the
    /// registry unloaded so the next call retries.
    pub(crate) async fn ensure_loaded(&mut self) -> ListResult<()> {
        if self.loaded {
            return Ok(());
        }

        self.load_catalogues().await?;
        self.load_lists().await?;
        self.loaded = true;

        info!(
            catalogues = self.catalogues.len(),
            lists = self.lists.len(),
            "Registries loaded"
        );
        Ok(())
    }

    async fn load_catalogues(&mut self) -> ListResult<()> {
        match self.catalogues_store.load().await? {
            Some(Value::Object(entries)) => {
                let mut catalogues = BTreeMap::new();
                for (id, entry) in entries {
                    match serde_json::from_value::<Catalogue>(entry) {
                        Ok(catalogue) => {
                            catalogues.insert(id, catalogue);
                        }
                        Err(e) => warn!(catalogue_id = %id, error = %e, "Skipping malformed catalogue"),
                    }
                }
                self.catalogues = catalogues;
            }
            other => {
                if other.is_some() {
                    warn!(key = %self.catalogues_store.key(), "Catalogue registry is not an object; rebuilding");
                }

                let mut catalogues = BTreeMap::new();
                catalogues.insert(
                    DEFAULT_LIST_ID.to_string(),
                    Catalogue {
                        name: DEFAULT_CATALOGUE_NAME.to_string(),
                        icon: DEFAULT_CATALOGUE_ICON.to_string(),
                        products_store_key: self.layout.products_key(DEFAULT_LIST_ID),
                    },
                );
                self.catalogues_store.save(&catalogues).await?;
                self.catalogues = catalogues;
                info!("Bootstrapped catalogue registry");
            }
        }
        Ok(())
    }

    async fn load_lists(&mut self) -> ListResult<()> {
        let now = epoch_now();

        match self.lists_store.load().await? {
            Some(Value::Object(entries)) => {
                let mut lists = BTreeMap::new();
                let mut migrated = 0usize;
                for (id, entry) in entries {
                    let (meta, changed) = ListMeta::migrate(&id, &entry, now);
                    if changed {
                        migrated += 1;
                    }
                    lists.insert(id, meta);
                }

                if migrated > 0 {
                    self.lists_store.save(&lists).await?;
                    info!(migrated, "Migrated list registry entries");
                }
                self.lists = lists;
            }
            other => {
                if other.is_some() {
                    warn!(key = %self.lists_store.key(), "List registry is not an object; rebuilding");
                }

                let mut lists = BTreeMap::new();
                lists.insert(DEFAULT_LIST_ID.to_string(), ListMeta::system(DEFAULT_LIST_ID, now));
                self.lists_store.save(&lists).await?;
                self.lists = lists;
                info!("Bootstrapped list registry");
            }
        }
        Ok(())
    }

    /// Adds a system-owned shared entry for an unknown list, backed by a
    /// catalogue of the same id. Returns whether anything was added.
    pub(crate) async fn register_list(&mut self, list_id: &str) -> ListResult<bool> {
        if self.lists.contains_key(list_id) {
            return Ok(false);
        }

        self.add_list(list_id, ListMeta::system(list_id, epoch_now()), None)
            .await?;

        debug!(list_id = %list_id, "Registered list");
        Ok(true)
    }

    /// Storage key of the products blob backing `list_id`.
    pub(crate) fn products_key_for(&self, list_id: &str) -> String {
        let catalogue_id = self
            .lists
            .get(list_id)
            .map(|meta| meta.catalogue_id.as_str())
            .unwrap_or(list_id);

        match self.catalogues.get(catalogue_id) {
            Some(catalogue) => catalogue.products_store_key.clone(),
            None => self.layout.products_key(list_id),
        }
    }

    pub(crate) fn has_catalogue(&self, catalogue_id: &str) -> bool {
        self.catalogues.contains_key(catalogue_id)
    }

    /// Adds a list, and optionally a catalogue under the same id.
    ///
    /// Memory only changes once every write has succeeded. If the list
    /// registry write fails after the catalogue was saved, the previous
    /// catalogue registry is written back.
    pub(crate) async fn add_list(
        &mut self,
        id: &str,
        meta: ListMeta,
        catalogue: Option<Catalogue>,
    ) -> ListResult<()> {
        let mut lists = self.lists.clone();
        lists.insert(id.to_string(), meta);

        let Some(catalogue) = catalogue else {
            self.lists_store.save(&lists).await?;
            self.lists = lists;
            return Ok(());
        };

        let mut catalogues = self.catalogues.clone();
        catalogues.insert(id.to_string(), catalogue);
        self.catalogues_store.save(&catalogues).await?;

        if let Err(e) = self.lists_store.save(&lists).await {
            if let Err(rollback) = self.catalogues_store.save(&self.catalogues).await {
                warn!(
                    list_id = %id,
                    error = %rollback,
                    "Could not roll back catalogue registry; catalogue left without a list"
                );
            }
            return Err(e.into());
        }

        self.catalogues = catalogues;
        self.lists = lists;
        Ok(())
    }

    pub(crate) fn catalogues(&self) -> &BTreeMap<String, Catalogue> {
        &self.catalogues
    }

    pub(crate) fn lists(&self) -> &BTreeMap<String, ListMeta> {
        &self.lists
    }
}
