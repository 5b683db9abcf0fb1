//! Product queries

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::Product;

/// One page of the catalog, ordered by name
pub async fn list_products(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, price, category, created_at
        FROM products
        ORDER BY name, id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn get_product(pool: &SqlitePool, id: &str) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, price, category, created_at FROM products WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Products matching any of `ids`, ordered by name
pub async fn get_products<'e, E>(executor: E, ids: &[String]) -> Result<Vec<Product>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, name, price, category, created_at FROM products WHERE id IN (",
    );
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY name, id");

    builder.build_query_as::<Product>().fetch_all(executor).await
}

/// Ids from `ids` with no matching product (deduplicated, input order)
pub async fn missing_product_ids<'e, E>(
    executor: E,
    ids: &[String],
) -> Result<Vec<String>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let found = get_products(executor, ids).await?;

    let mut missing: Vec<String> = Vec::new();
    for id in ids {
        if !found.iter().any(|p| &p.id == id) && !missing.contains(id) {
            missing.push(id.clone());
        }
    }
    Ok(missing)
}
