//! Order Repository

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderCreate, OrderItem, OrderStatus};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, order_number, customer_email, total_cents, packaging_cents, shipping_cents, customs_cents, status, utm_source, utm_campaign, payment_ref, created_at, paid_at, updated_at";

/// Insert an order with its lines (one transaction)
pub async fn create(pool: &SqlitePool, data: &OrderCreate) -> RepoResult<Order> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO orders (id, order_number, customer_email, total_cents, packaging_cents, shipping_cents, customs_cents, status, utm_source, utm_campaign, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.order_number)
    .bind(&data.customer_email)
    .bind(data.total_cents())
    .bind(data.packaging_cents)
    .bind(data.shipping_cents)
    .bind(data.customs_cents)
    .bind(OrderStatus::AwaitingPayment)
    .bind(&data.utm_source)
    .bind(&data.utm_campaign)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for item in &data.items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, producer_id, sku, name, quantity, unit_price_cents, unit_cost_cents) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(shared::util::snowflake_id())
        .bind(id)
        .bind(item.producer_id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.unit_cost_cents)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to read order after insert".into()))
}

/// Order with its items
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {COLUMNS} FROM orders WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match order {
        Some(mut order) => {
            order.items = items_for_order(pool, order.id).await?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

pub async fn find_by_number(pool: &SqlitePool, order_number: &str) -> RepoResult<Option<Order>> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM orders WHERE order_number = ?")
        .bind(order_number)
        .fetch_optional(pool)
        .await?;
    match id {
        Some(id) => find_by_id(pool, id).await,
        None => Ok(None),
    }
}

pub async fn items_for_order<'e, E>(exec: E, order_id: i64) -> RepoResult<Vec<OrderItem>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, producer_id, sku, name, quantity, unit_price_cents, unit_cost_cents FROM order_items WHERE order_id = ? ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(exec)
    .await?;
    Ok(items)
}

/// `awaiting_payment -> paid`; returns false when the order was not awaiting payment
pub async fn mark_paid(
    conn: &mut SqliteConnection,
    order_id: i64,
    payment_ref: &str,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET status = ?1, payment_ref = ?2, paid_at = ?3, updated_at = ?3 WHERE id = ?4 AND status = ?5",
    )
    .bind(OrderStatus::Paid)
    .bind(payment_ref)
    .bind(now)
    .bind(order_id)
    .bind(OrderStatus::AwaitingPayment)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Aggregate status driven by fulfillment; never moves a cancelled order
pub async fn set_fulfillment_status(
    pool: &SqlitePool,
    order_id: i64,
    status: OrderStatus,
) -> RepoResult<()> {
    sqlx::query("UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status != ?4")
        .bind(status)
        .bind(shared::util::now_millis())
        .bind(order_id)
        .bind(OrderStatus::Cancelled)
        .execute(pool)
        .await?;
    Ok(())
}
