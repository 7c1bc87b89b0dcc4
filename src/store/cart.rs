//! Cart persistence. Stock checks here guard insertion time only; checkout
//! re-validates every line inside its own transaction.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine, CartLineDetail};
use crate::error::{Error, Result};

/// Idempotent get-or-create, called at the HTTP boundary so the other cart
/// operations never create carts as a side effect.
pub async fn ensure_cart(pool: &PgPool, user_id: Uuid) -> Result<Cart> {
    sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(pool)
        .await?;
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(cart)
}

pub async fn find_cart(pool: &PgPool, user_id: Uuid) -> Result<Cart> {
    sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("cart"))
}

/// Adds `qty` of a book, accumulating onto an existing line. The accumulated
/// quantity must not exceed live stock; the book row is locked so a
/// concurrent checkout cannot consume the stock between check and upsert.
pub async fn add_line(pool: &PgPool, cart_id: Uuid, book_id: Uuid, qty: i32) -> Result<CartLine> {
    let mut tx = pool.begin().await?;

    let stock: i32 = sqlx::query_scalar("SELECT stock FROM books WHERE id = $1 FOR UPDATE")
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("book"))?;
    let existing: Option<i32> =
        sqlx::query_scalar("SELECT quantity FROM cart_lines WHERE cart_id = $1 AND book_id = $2")
            .bind(cart_id)
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;

    let requested = existing.unwrap_or(0) + qty;
    if requested > stock {
        return Err(Error::InsufficientStock {
            book_id,
            available: stock,
            requested,
        });
    }

    let line = sqlx::query_as::<_, CartLine>(
        "INSERT INTO cart_lines (id, cart_id, book_id, quantity) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (cart_id, book_id) DO UPDATE SET quantity = cart_lines.quantity + $4 RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(cart_id)
    .bind(book_id)
    .bind(qty)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(line)
}

/// Sets a line's quantity outright (no accumulation), still bounded by live
/// stock.
pub async fn update_line(
    pool: &PgPool,
    cart_id: Uuid,
    book_id: Uuid,
    new_qty: i32,
) -> Result<CartLine> {
    let mut tx = pool.begin().await?;

    let stock: i32 = sqlx::query_scalar("SELECT stock FROM books WHERE id = $1 FOR UPDATE")
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("book"))?;
    if new_qty > stock {
        return Err(Error::InsufficientStock {
            book_id,
            available: stock,
            requested: new_qty,
        });
    }

    let line = sqlx::query_as::<_, CartLine>(
        "UPDATE cart_lines SET quantity = $3 WHERE cart_id = $1 AND book_id = $2 RETURNING *",
    )
    .bind(cart_id)
    .bind(book_id)
    .bind(new_qty)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(Error::NotFound("cart line"))?;

    tx.commit().await?;
    Ok(line)
}

pub async fn remove_line(pool: &PgPool, cart_id: Uuid, book_id: Uuid) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1 AND book_id = $2")
        .bind(cart_id)
        .bind(book_id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(Error::NotFound("cart line"));
    }
    Ok(())
}

/// Removes every line. The cart row itself survives.
pub async fn clear(pool: &PgPool, cart_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Snapshot of the cart's lines joined with current book data, the input to
/// the derived-total functions in `domain::cart`.
pub async fn lines(pool: &PgPool, cart_id: Uuid) -> Result<Vec<CartLineDetail>> {
    let lines = sqlx::query_as::<_, CartLineDetail>(
        "SELECT cl.book_id, b.title, cl.quantity, b.price AS unit_price, b.stock \
         FROM cart_lines cl JOIN books b ON b.id = cl.book_id \
         WHERE cl.cart_id = $1 ORDER BY b.title",
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await?;
    Ok(lines)
}
