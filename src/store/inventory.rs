//! Inventory ledger: the only writers of `books.stock` besides the admin
//! stock endpoint.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Decrements stock by `qty`, failing with `InsufficientStock` if fewer than
/// `qty` copies remain. The check and the write are one statement, so two
/// concurrent reservations on the same book cannot both pass.
///
/// Takes a connection rather than the pool: reservations only make sense
/// inside the transaction that creates the matching order lines.
pub async fn reserve(conn: &mut PgConnection, book_id: Uuid, qty: i32) -> Result<()> {
    let updated = sqlx::query("UPDATE books SET stock = stock - $2, updated_at = now() WHERE id = $1 AND stock >= $2")
        .bind(book_id)
        .bind(qty)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if updated == 0 {
        let available: Option<i32> = sqlx::query_scalar("SELECT stock FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&mut *conn)
            .await?;
        return match available {
            Some(available) => Err(Error::InsufficientStock {
                book_id,
                available,
                requested: qty,
            }),
            None => Err(Error::NotFound("book")),
        };
    }
    Ok(())
}

/// Increments stock by `qty`. Restoring previously consumed stock is always
/// valid, so there is no upper bound.
pub async fn release(conn: &mut PgConnection, book_id: Uuid, qty: i32) -> Result<()> {
    let updated = sqlx::query("UPDATE books SET stock = stock + $2, updated_at = now() WHERE id = $1")
        .bind(book_id)
        .bind(qty)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(Error::NotFound("book"));
    }
    Ok(())
}
