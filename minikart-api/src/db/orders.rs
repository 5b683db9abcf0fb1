//! Order persistence

use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::models::{Order, OrderItem};

/// Insert the order header and its items inside `tx`
pub async fn insert_order(
    tx: &mut Transaction<'_, Sqlite>,
    order: &Order,
    items: &[OrderItem],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO orders (id, coupon_code, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&order.id)
    .bind(&order.coupon_code)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&order.id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Order header and items, or None when the id is unknown
pub async fn get_order(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<(Order, Vec<OrderItem>)>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        "SELECT id, coupon_code, created_at, updated_at FROM orders WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(order) = order else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT product_id, quantity FROM order_items WHERE order_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some((order, items)))
}
