//! # Catalog Seeder
//!
//! Imports a country product catalog into a list.
//!
//! ## Usage
//! ```bash
//! # Import data/products_catalog_nz.json into groceries in ./basket.db
//! cargo run -p basket-lists --bin seed -- --data ./data --country NZ
//!
//! # Into a Home Assistant style .storage directory instead
//! cargo run -p basket-lists --bin seed -- --storage-dir ./.storage --list hardware
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use basket_lists::{seed, ListManager};
use basket_store::{BlobStore, JsonFileStore, SqliteConfig, SqliteStore};
use tracing_subscriber::EnvFilter;

struct Args {
    db: PathBuf,
    storage_dir: Option<PathBuf>,
    data_dir: PathBuf,
    country: String,
    list_id: String,
}

fn print_help() {
    println!("Basket catalog seeder");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>            SQLite database (default: ./basket.db)");
    println!("  -s, --storage-dir <DIR>    Use a JSON file store instead of SQLite");
    println!("      --data <DIR>           Seed data directory (default: ./data)");
    println!("  -c, --country <CC>         Country code (default: NZ)");
    println!("  -l, --list <ID>            Target list (default: groceries)");
    println!("  -h, --help                 Show this help message");
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args {
        db: PathBuf::from("./basket.db"),
        storage_dir: None,
        data_dir: PathBuf::from("./data"),
        country: "NZ".to_string(),
        list_id: basket_core::DEFAULT_LIST_ID.to_string(),
    };

    let mut iter = env::args().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = || iter.next().with_context(|| format!("{flag} needs a value"));
        match flag.as_str() {
            "-d" | "--db" => args.db = PathBuf::from(value()?),
            "-s" | "--storage-dir" => args.storage_dir = Some(PathBuf::from(value()?)),
            "--data" => args.data_dir = PathBuf::from(value()?),
            "-c" | "--country" => args.country = value()?,
            "-l" | "--list" => args.list_id = value()?,
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            other => bail!("unknown option: {other}"),
        }
    }

    Ok(Some(args))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let backend: Arc<dyn BlobStore> = match &args.storage_dir {
        Some(dir) => Arc::new(JsonFileStore::new(dir)),
        None => Arc::new(
            SqliteStore::new(SqliteConfig::new(&args.db))
                .await
                .context("opening database")?,
        ),
    };

    let manager = ListManager::new(backend);

    let products = seed::load_product_catalog(&args.data_dir, &args.country).await;
    if products.is_empty() {
        println!("⚠ No products found for {} in {}", args.country, args.data_dir.display());
        return Ok(());
    }

    let imported = manager
        .import_products(&args.list_id, products)
        .await
        .context("importing catalog")?;

    println!("✓ Imported {} products into '{}'", imported, args.list_id);
    Ok(())
}
