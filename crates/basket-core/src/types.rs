//! # Domain Types
//!
//! Core domain types used throughout Basket.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   ActiveItem    │   │   Catalogue     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  key (identity) │◄──│  qty ≥ 1        │   │  name, icon     │       │
//! │  │  name           │   │  (keyed by      │   │  products_store │       │
//! │  │  category, unit │   │   product key)  │   │  (storage key)  │       │
//! │  │  image          │   └─────────────────┘   └────────▲────────┘       │
//! │  └─────────────────┘                                  │                 │
//! │                                              ┌────────┴────────┐       │
//! │  ┌─────────────────┐   ┌─────────────────┐   │    ListMeta     │       │
//! │  │    Category     │   │      User       │   │  ─────────────  │       │
//! │  │  ─────────────  │   │  ─────────────  │──►│  catalogue      │       │
//! │  │  id, name       │   │  id             │   │  owner          │       │
//! │  │  icon, color    │   │  is_admin       │   │  visibility     │       │
//! │  └─────────────────┘   └─────────────────┘   │  created/updated│       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stored Field Names
//! Field names match the blobs already on disk (`products_store`,
//! `catalogue`, float epoch timestamps), so existing data loads unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::validation::{validate_product_key, validate_product_name, ValidationResult};
use crate::{DEFAULT_CATEGORY, DEFAULT_UNIT, SYSTEM_OWNER};

// =============================================================================
// Product
// =============================================================================

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// A catalog entry: what *can* be shopped for on a list.
///
/// Identity is `key`. Every other field is replaced wholesale on upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier within the list's catalogue.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Category id (see [`Category`]).
    #[serde(default = "default_category")]
    pub category: String,

    /// Unit of measurement ("pcs", "kg", ...).
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Image URL, empty when none.
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// Checks the product's key and name.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_product_key(&self.key)?;
        validate_product_name(&self.name)?;
        Ok(())
    }
}

/// Input for `add_product`: optional fields fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewProduct {
    /// Shorthand for a product with only the required fields.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Validates and fills defaults.
    ///
    /// ## Example
    /// ```rust
    /// use basket_core::types::NewProduct;
    ///
    /// let product = NewProduct::new("milk", "Milk").into_product().unwrap();
    /// assert_eq!(product.category, "other");
    /// assert_eq!(product.unit, "pcs");
    /// assert_eq!(product.image, "");
    /// ```
    pub fn into_product(self) -> ValidationResult<Product> {
        let product = Product {
            key: self.key,
            name: self.name,
            category: self.category.unwrap_or_else(default_category),
            unit: self.unit.unwrap_or_else(default_unit),
            image: self.image.unwrap_or_default(),
        };
        product.validate()?;
        Ok(product)
    }
}

// =============================================================================
// Active Item
// =============================================================================

/// Quantity-only entry on a list's active (to-buy) set.
///
/// A stored item always has `qty >= 1`; zero is the removal signal and
/// never reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActiveItem {
    pub qty: u32,
}

impl ActiveItem {
    /// Returns `None` for zero.
    pub fn from_quantity(qty: u32) -> Option<Self> {
        (qty > 0).then_some(Self { qty })
    }

    /// Parses a stored `{"qty": n}` value, rejecting anything that is not
    /// a positive integer.
    pub fn from_stored(value: &Value) -> Option<Self> {
        let qty = value.get("qty")?.as_u64()?;
        u32::try_from(qty).ok().and_then(Self::from_quantity)
    }
}

// =============================================================================
// Catalogue
// =============================================================================

/// A product catalogue. Several lists may point at the same catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Catalogue {
    pub name: String,
    pub icon: String,
    /// Storage key of the products blob.
    #[serde(rename = "products_store")]
    pub products_store_key: String,
}

// =============================================================================
// List Metadata
// =============================================================================

/// Who can see a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Everyone.
    #[default]
    Shared,
    /// Owner and admins only.
    Private,
}

impl Visibility {
    /// Parses the stored string. Unknown values are treated as private,
    /// which is what a plain `== "shared"` check does.
    pub fn parse(value: &str) -> Self {
        match value {
            "shared" => Visibility::Shared,
            _ => Visibility::Private,
        }
    }
}

/// Current time as float epoch seconds, the stored timestamp format.
pub fn epoch_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Registry entry for one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListMeta {
    /// Id of the catalogue backing this list.
    #[serde(rename = "catalogue")]
    pub catalogue_id: String,
    pub owner: String,
    pub visibility: Visibility,
    /// Float epoch seconds.
    pub created_at: f64,
    /// Float epoch seconds.
    pub updated_at: f64,
}

impl ListMeta {
    /// A system-owned shared list, stamped at `now`.
    pub fn system(catalogue_id: impl Into<String>, now: f64) -> Self {
        Self {
            catalogue_id: catalogue_id.into(),
            owner: SYSTEM_OWNER.to_string(),
            visibility: Visibility::Shared,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds metadata from a stored registry entry, filling anything
    /// missing.
    ///
    /// ## Migration Rules
    /// ```text
    /// catalogue   missing → list_id
    /// owner       missing → "system"
    /// visibility  missing → "shared"
    /// created_at  missing → now
    /// updated_at  missing → now
    /// ```
    ///
    /// Returns the metadata and whether anything had to be filled in.
    pub fn migrate(list_id: &str, stored: &Value, now: f64) -> (Self, bool) {
        let mut changed = false;

        let mut text = |field: &str, fallback: &str| match stored.get(field).and_then(Value::as_str) {
            Some(value) => value.to_string(),
            None => {
                changed = true;
                fallback.to_string()
            }
        };

        let catalogue_id = text("catalogue", list_id);
        let owner = text("owner", SYSTEM_OWNER);
        let visibility = Visibility::parse(&text("visibility", "shared"));

        let mut stamp = |field: &str| match stored.get(field).and_then(Value::as_f64) {
            Some(value) => value,
            None => {
                changed = true;
                now
            }
        };

        let created_at = stamp("created_at");
        let updated_at = stamp("updated_at");

        let meta = Self {
            catalogue_id,
            owner,
            visibility,
            created_at,
            updated_at,
        };
        (meta, changed)
    }
}

// =============================================================================
// User
// =============================================================================

/// The identity attached to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn new(id: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id: id.into(),
            is_admin,
        }
    }

    /// Admins see everything; others see shared lists and their own.
    pub fn can_see(&self, meta: &ListMeta) -> bool {
        self.is_admin || meta.visibility == Visibility::Shared || meta.owner == self.id
    }
}

// =============================================================================
// Category
// =============================================================================

/// Product category used by the frontend for grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub system: bool,
}

impl Category {
    /// The three categories used when no seed file is readable.
    pub fn builtin() -> Vec<Category> {
        let make = |id: &str, name: &str, icon: &str, color: &str, sort_order| Category {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            sort_order,
            system: true,
        };

        vec![
            make("produce", "Produce", "mdi:fruit-cherries", "#4CAF50", 1),
            make("dairy", "Dairy", "mdi:cheese", "#FFC107", 2),
            make("other", "Other", "mdi:dots-horizontal", "#9E9E9E", 99),
        ]
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
