//! Database access layer for minikart-api
//!
//! SQLite via sqlx. The schema is created idempotently at startup and the
//! sample catalog is seeded when `products` is empty.

use chrono::Utc;
use minikart_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub mod orders;
pub mod products;

/// Sample catalog inserted into an empty database
const SAMPLE_PRODUCTS: [(&str, &str, f64, &str); 5] = [
    ("P001", "Test Product 1", 10.0, "A"),
    ("P002", "Test Product 2", 20.0, "B"),
    ("P003", "Test Product 3", 30.0, "A"),
    ("P004", "Test Product 4", 40.0, "C"),
    ("P005", "Test Product 5", 50.0, "B"),
];

/// Open (creating if needed) the database file and prepare the schema
pub async fn init_database(db_path: &Path, max_connections: u32) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    prepare(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database with schema and catalog
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        // The database lives only as long as its one connection
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    prepare(&pool).await?;
    Ok(pool)
}

/// Create tables and seed the catalog (idempotent)
pub async fn prepare(pool: &SqlitePool) -> Result<()> {
    create_products_table(pool).await?;
    create_orders_table(pool).await?;
    create_order_items_table(pool).await?;
    seed_products(pool).await?;
    Ok(())
}

async fn create_products_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            price REAL NOT NULL CHECK (price >= 0),
            category TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_orders_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            coupon_code TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_order_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_items (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            product_id TEXT NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn seed_products(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let now = Utc::now();
    for (id, name, price, category) in SAMPLE_PRODUCTS {
        sqlx::query(
            "INSERT INTO products (id, name, price, category, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(price)
        .bind(category)
        .bind(now)
        .execute(pool)
        .await?;
    }

    info!(products = SAMPLE_PRODUCTS.len(), "Seeded sample catalog");
    Ok(())
}
