//! # Storage Key Layout
//!
//! ```text
//! <domain>.catalogues                 catalogue registry
//! <domain>.lists                      list registry
//! <domain>.products                   products of the default catalogue
//! <domain>.active_list                active set of the default list
//! <domain>.<catalogue_id>.products    products of any other catalogue
//! <domain>.<list_id>.active_list      active set of any other list
//! ```
//!
//! The default list keeps the flat keys so data written before multi-list
//! support loads as-is.

use basket_core::DEFAULT_LIST_ID;

/// Storage domain used unless configured otherwise.
pub const DEFAULT_DOMAIN: &str = "shopping_list_manager";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    domain: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN)
    }
}

impl StorageLayout {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn catalogues_key(&self) -> String {
        format!("{}.catalogues", self.domain)
    }

    pub fn lists_key(&self) -> String {
        format!("{}.lists", self.domain)
    }

    /// Products blob for a catalogue that has no registry entry yet.
    pub fn products_key(&self, catalogue_id: &str) -> String {
        if catalogue_id == DEFAULT_LIST_ID {
            format!("{}.products", self.domain)
        } else {
            format!("{}.{}.products", self.domain, catalogue_id)
        }
    }

    pub fn active_key(&self, list_id: &str) -> String {
        if list_id == DEFAULT_LIST_ID {
            format!("{}.active_list", self.domain)
        } else {
            format!("{}.{}.active_list", self.domain, list_id)
        }
    }
}
