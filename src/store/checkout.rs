//! Order persistence and the cart-to-order transitions.
//!
//! `checkout` and `cancel_order` each run as one Postgres transaction; any
//! error before commit rolls the whole unit back, so a failed checkout leaves
//! cart, orders, and stock exactly as they were.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::order::{Order, OrderLine, OrderStatus};
use crate::error::{Error, Result};
use crate::store::inventory;

#[derive(sqlx::FromRow)]
struct CheckoutLine {
    book_id: Uuid,
    quantity: i32,
    price: Decimal,
    stock: i32,
}

/// Converts the user's cart into a pending order.
///
/// Re-validates every line against live stock even though lines were checked
/// on insertion: stock may have been consumed by other checkouts since. The
/// book rows are locked by the initial select, so between validation and
/// reservation nothing else can touch them.
pub async fn checkout(pool: &PgPool, user_id: Uuid) -> Result<(Order, Vec<OrderLine>)> {
    let mut tx = pool.begin().await?;

    let cart_id: Uuid = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("cart"))?;

    // Lock books in a stable order so concurrent checkouts cannot deadlock.
    let lines = sqlx::query_as::<_, CheckoutLine>(
        "SELECT cl.book_id, cl.quantity, b.price, b.stock \
         FROM cart_lines cl JOIN books b ON b.id = cl.book_id \
         WHERE cl.cart_id = $1 ORDER BY cl.book_id FOR UPDATE OF b",
    )
    .bind(cart_id)
    .fetch_all(&mut *tx)
    .await?;

    if lines.is_empty() {
        return Err(Error::EmptyCart);
    }
    for line in &lines {
        if line.quantity > line.stock {
            return Err(Error::InsufficientStock {
                book_id: line.book_id,
                available: line.stock,
                requested: line.quantity,
            });
        }
    }

    let total_price: Decimal = lines
        .iter()
        .map(|l| l.price * Decimal::from(l.quantity))
        .sum();

    let seq: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
        .fetch_one(&mut *tx)
        .await?;
    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, user_id, status, total_price, created_at, updated_at) \
         VALUES ($1, $2, $3, 'pending', $4, now(), now()) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(format!("ORD-{:08}", seq))
    .bind(user_id)
    .bind(total_price)
    .fetch_one(&mut *tx)
    .await?;

    let mut order_lines = Vec::with_capacity(lines.len());
    for line in &lines {
        let order_line = sqlx::query_as::<_, OrderLine>(
            "INSERT INTO order_lines (id, order_id, book_id, quantity, unit_price) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(line.book_id)
        .bind(line.quantity)
        .bind(line.price)
        .fetch_one(&mut *tx)
        .await?;
        inventory::reserve(&mut *tx, line.book_id, line.quantity).await?;
        order_lines.push(order_line);
    }

    sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        user_id = %user_id,
        total = %order.total_price,
        "checkout committed"
    );
    Ok((order, order_lines))
}

/// Cancels a pending order, restoring every line's stock. The order remains
/// as a historical record; only its status changes.
pub async fn cancel_order(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> Result<Order> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(Error::NotFound("order"))?;

    if order.status != OrderStatus::Pending {
        return Err(Error::InvalidStateTransition {
            from: order.status,
            to: OrderStatus::Cancelled,
        });
    }

    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT * FROM order_lines WHERE order_id = $1 ORDER BY book_id",
    )
    .bind(order_id)
    .fetch_all(&mut *tx)
    .await?;
    for line in &lines {
        inventory::release(&mut *tx, line.book_id, line.quantity).await?;
    }

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = 'cancelled', updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(order_id = %order.id, user_id = %user_id, "order cancelled, stock released");
    Ok(order)
}

/// Externally driven status updates (`pending -> processing -> completed`).
/// These never touch inventory; `cancelled` is rejected here because only
/// `cancel_order` restores stock.
pub async fn update_status(
    pool: &PgPool,
    user_id: Uuid,
    order_id: Uuid,
    next: OrderStatus,
) -> Result<Order> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(Error::NotFound("order"))?;

    if next == OrderStatus::Cancelled || !order.status.can_transition_to(next) {
        return Err(Error::InvalidStateTransition {
            from: order.status,
            to: next,
        });
    }

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .bind(next)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(order)
}

pub async fn list_orders(pool: &PgPool, user_id: Uuid) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

pub async fn get_order(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> Result<(Order, Vec<OrderLine>)> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("order"))?;
    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT * FROM order_lines WHERE order_id = $1 ORDER BY book_id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok((order, lines))
}
