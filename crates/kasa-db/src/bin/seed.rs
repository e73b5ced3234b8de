//! # Seed Data Generator
//!
//! Populates a store with demo products for development.
//!
//! ## Usage
//! ```bash
//! # Seed 200 products into store "store-1" using defaults
//! cargo run -p kasa-db --bin seed
//!
//! # Custom amount, store and config file
//! cargo run -p kasa-db --bin seed -- --count 1000 --store store-2 --config ./kasa.toml
//! ```
//!
//! Products get SKUs `{CATEGORY}-{INDEX:04}`. Existing SKUs are skipped, so
//! running the seed twice is harmless.

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use kasa_core::Product;
use kasa_db::migrations::migration_status;
use kasa_db::{AppConfig, Database};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Category codes with product names.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("BEV", &["Cola", "Lemonade", "Iced Tea", "Orange Juice", "Sparkling Water", "Cold Brew"]),
    ("SNK", &["Salted Chips", "Pretzels", "Granola Bar", "Chocolate Bar", "Trail Mix"]),
    ("BAK", &["Croissant", "Bagel", "Blueberry Muffin", "Sourdough Loaf", "Cinnamon Roll"]),
    ("DLI", &["Turkey Sandwich", "Caesar Wrap", "Pasta Salad", "Tomato Soup"]),
];

/// Tax rates in basis points.
const TAX_RATES: &[u32] = &[0, 500, 825, 1000];

struct Args {
    count: usize,
    store_id: String,
    config: Option<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let mut args = Args {
        count: 200,
        store_id: String::from("store-1"),
        config: env::var("KASA_CONFIG").ok().map(PathBuf::from),
    };

    let raw: Vec<String> = env::args().skip(1).collect();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--count" | "-c" => {
                if let Some(value) = iter.next() {
                    match value.parse() {
                        Ok(count) => args.count = count,
                        Err(_) => warn!(value = %value, "Ignoring invalid --count"),
                    }
                }
            }
            "--store" | "-s" => {
                if let Some(value) = iter.next() {
                    args.store_id = value.clone();
                }
            }
            "--config" => {
                if let Some(value) = iter.next() {
                    args.config = Some(PathBuf::from(value));
                }
            }
            "--help" | "-h" => {
                println!("Kasa Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 200)");
                println!("  -s, --store <ID>     Store to seed (default: store-1)");
                println!("      --config <PATH>  Config file (default: $KASA_CONFIG)");
                println!("  -h, --help           Show this help message");
                return None;
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
    }

    Some(args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kasa=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    let config = AppConfig::load(args.config.as_deref())?;
    info!(path = ?config.database.path, store_id = %args.store_id, count = args.count, "Seeding products");

    let db = Database::new(config.database.db_config()).await?;
    let status = migration_status(db.pool()).await?;
    info!(embedded = status.embedded, applied = status.applied, "Schema checked");

    let products = db.products();

    let start = std::time::Instant::now();
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    let catalog = CATEGORIES
        .iter()
        .flat_map(|(code, names)| names.iter().map(move |name| (*code, *name)))
        .cycle()
        .take(args.count);

    for (index, (code, name)) in catalog.enumerate() {
        let product = generate_product(&args.store_id, code, name, index);

        if products.get_by_sku(&args.store_id, &product.sku).await?.is_some() {
            skipped += 1;
            continue;
        }

        products.insert(&product).await?;
        inserted += 1;
    }

    info!(
        inserted,
        skipped,
        total = products.count(&args.store_id).await?,
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

/// Builds one demo product. Prices land between $1.99 and $9.98.
fn generate_product(store_id: &str, category: &str, name: &str, index: usize) -> Product {
    let now = Utc::now();
    let untracked = category == "DLI";

    Product {
        id: Uuid::new_v4().to_string(),
        store_id: store_id.to_string(),
        sku: format!("{category}-{index:04}"),
        name: name.to_string(),
        price_cents: 199 + ((index * 37) % 800) as i64,
        tax_rate_bps: TAX_RATES[index % TAX_RATES.len()],
        track_inventory: !untracked,
        current_stock: if untracked { 0 } else { (index % 101) as i64 },
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
