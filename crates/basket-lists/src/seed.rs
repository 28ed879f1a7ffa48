//! # Seed Data Loaders
//!
//! Country-specific product catalogs and categories shipped as JSON files
//! in a data directory.
//!
//! ## File Resolution
//! ```text
//! load_product_catalog(dir, "NZ")
//!      │
//!      ├── dir/products_catalog_nz.json exists? ──► parse products[]
//!      └── otherwise ──────────────────────────────► [] (warn)
//!
//! load_categories(dir, Some("NZ"))
//!      │
//!      ├── dir/categories_nz.json exists? ──► parse categories[]
//!      ├── dir/categories.json ─────────────► parse categories[]
//!      └── unreadable / invalid ────────────► Category::builtin()
//! ```
//!
//! Neither loader fails: a broken seed file degrades to an empty catalog
//! or the built-in categories and is logged.

use std::path::{Path, PathBuf};

use basket_core::{Category, NewProduct};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

// =============================================================================
// File Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    products: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CategoriesFile {
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    categories: Vec<Category>,
}

/// One product entry of a catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub default_unit: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CatalogEntry {
    /// Maps the entry onto an `add_product` input. Entries without an id
    /// are keyed by a slug of their name.
    pub fn into_new_product(self) -> NewProduct {
        let key = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => slugify(&self.name),
        };

        NewProduct {
            key,
            name: self.name,
            category: self.category_id,
            unit: self.default_unit,
            image: self.image_url,
        }
    }
}

/// Lowercase, with runs of anything but letters and digits turned into `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

fn version_label(version: &Option<Value>) -> String {
    match version {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "unknown".to_string(),
    }
}

// =============================================================================
// Loaders
// =============================================================================

/// Path of the country catalog file inside `data_dir`.
pub fn catalog_path(data_dir: &Path, country: &str) -> PathBuf {
    data_dir.join(format!("products_catalog_{}.json", country.to_lowercase()))
}

/// Loads the product catalog for `country`.
pub async fn load_product_catalog(data_dir: &Path, country: &str) -> Vec<NewProduct> {
    if country.trim().is_empty() {
        return Vec::new();
    }

    let path = catalog_path(data_dir, country);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(country = %country, "No country-specific catalog found");
            return Vec::new();
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read product catalog");
            return Vec::new();
        }
    };

    let file: CatalogFile = match serde_json::from_slice(&bytes) {
        Ok(file) => file,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to parse product catalog");
            return Vec::new();
        }
    };

    info!(
        version = %version_label(&file.version),
        region = %file.region.as_deref().unwrap_or("default"),
        "Loaded product catalog"
    );

    let total = file.products.len();
    let products: Vec<NewProduct> = file
        .products
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<CatalogEntry>(entry) {
            Ok(entry) => Some(entry.into_new_product()),
            Err(e) => {
                warn!(error = %e, "Skipping malformed catalog entry");
                None
            }
        })
        .collect();

    info!(count = products.len(), skipped = total - products.len(), "Catalog products parsed");
    products
}

/// Loads categories, falling back to the generic file and then to
/// [`Category::builtin`].
pub async fn load_categories(data_dir: &Path, country: Option<&str>) -> Vec<Category> {
    let generic = data_dir.join("categories.json");

    let path = match country.filter(|c| !c.trim().is_empty()) {
        Some(country) => {
            let specific = data_dir.join(format!("categories_{}.json", country.to_lowercase()));
            if tokio::fs::try_exists(&specific).await.unwrap_or(false) {
                debug!(country = %country, "Using country-specific categories");
                specific
            } else {
                debug!(country = %country, "No country-specific categories, using default");
                generic
            }
        }
        None => generic,
    };

    match read_categories(&path).await {
        Some(categories) => categories,
        None => {
            warn!("Using fallback categories");
            Category::builtin()
        }
    }
}

async fn read_categories(path: &Path) -> Option<Vec<Category>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Categories file not readable");
            return None;
        }
    };

    match serde_json::from_slice::<CategoriesFile>(&bytes) {
        Ok(file) => {
            info!(
                version = %version_label(&file.version),
                region = %file.region.as_deref().unwrap_or("default"),
                count = file.categories.len(),
                "Loaded categories"
            );
            Some(file.categories)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to parse categories file");
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Whole Milk"), "whole_milk");
        assert_eq!(slugify("  Half & Half "), "half_half");
        assert_eq!(slugify("2% Milk"), "2_milk");
    }

    #[test]
    fn test_entry_mapping() {
        let entry: CatalogEntry = serde_json::from_str(
            r#"{"id": "milk_2l", "name": "Milk 2L", "category_id": "dairy", "default_unit": "L", "image_url": "/m.webp"}"#,
        )
        .unwrap();
        let product = entry.into_new_product().into_product().unwrap();

        assert_eq!(product.key, "milk_2l");
        assert_eq!(product.category, "dairy");
        assert_eq!(product.unit, "L");
        assert_eq!(product.image, "/m.webp");

        let entry: CatalogEntry = serde_json::from_str(r#"{"name": "Baked Beans"}"#).unwrap();
        let product = entry.into_new_product().into_product().unwrap();
        assert_eq!(product.key, "baked_beans");
        assert_eq!(product.unit, "pcs");
    }

    #[tokio::test]
    async fn test_catalog_for_country() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("products_catalog_nz.json"),
            r#"{"version": "1.0", "region": "NZ", "products": [
                {"id": "bread", "name": "Bread", "default_unit": "loaf"},
                {"no_name": true},
                {"name": "Flat White"}
            ]}"#,
        )
        .unwrap();

        let products = load_product_catalog(dir.path(), "NZ").await;
        let keys: Vec<_> = products.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["bread", "flat_white"]);
    }

    #[tokio::test]
    async fn test_missing_catalog_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_product_catalog(dir.path(), "AU").await.is_empty());
        assert!(load_product_catalog(dir.path(), "").await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_catalog_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("products_catalog_us.json"), "[not json").unwrap();
        assert!(load_product_catalog(dir.path(), "US").await.is_empty());
    }

    #[tokio::test]
    async fn test_categories_prefer_country_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("categories.json"),
            r#"{"categories": [{"id": "generic", "name": "Generic"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("categories_nz.json"),
            r#"{"region": "NZ", "categories": [{"id": "chilled", "name": "Chilled", "sort_order": 3}]}"#,
        )
        .unwrap();

        let nz = load_categories(dir.path(), Some("NZ")).await;
        assert_eq!(nz[0].id, "chilled");
        assert_eq!(nz[0].sort_order, 3);

        let fr = load_categories(dir.path(), Some("FR")).await;
        assert_eq!(fr[0].id, "generic");

        let none = load_categories(dir.path(), None).await;
        assert_eq!(none[0].id, "generic");
    }

    #[tokio::test]
    async fn test_categories_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let categories = load_categories(dir.path(), Some("NZ")).await;
        assert_eq!(categories, Category::builtin());

        std::fs::write(dir.path().join("categories.json"), "{").unwrap();
        assert_eq!(load_categories(dir.path(), None).await, Category::builtin());
    }
}
