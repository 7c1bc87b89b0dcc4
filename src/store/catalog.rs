//! Catalog CRUD. Plain persistence; stock changes beyond the admin set go
//! through `store::inventory`.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::book::{Book, NewBook};
use crate::error::{Error, Result};

pub async fn list_books(pool: &PgPool, page: u32, per_page: u32) -> Result<(Vec<Book>, i64)> {
    let books = sqlx::query_as::<_, Book>(
        "SELECT * FROM books ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(per_page as i64)
    .bind(((page - 1) * per_page) as i64)
    .fetch_all(pool)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
        .fetch_one(pool)
        .await?;
    Ok((books, total.0))
}

pub async fn get_book(pool: &PgPool, id: Uuid) -> Result<Book> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("book"))
}

pub async fn create_book(pool: &PgPool, new: &NewBook) -> Result<Book> {
    let book = sqlx::query_as::<_, Book>(
        "INSERT INTO books (id, title, author, description, price, stock, isbn, published_date, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now()) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&new.title)
    .bind(&new.author)
    .bind(&new.description)
    .bind(new.price)
    .bind(new.stock)
    .bind(&new.isbn)
    .bind(new.published_date)
    .fetch_one(pool)
    .await?;
    Ok(book)
}

pub async fn update_book(pool: &PgPool, id: Uuid, new: &NewBook) -> Result<Book> {
    sqlx::query_as::<_, Book>(
        "UPDATE books SET title = $2, author = $3, description = $4, price = $5, isbn = $6, published_date = $7, updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&new.title)
    .bind(&new.author)
    .bind(&new.description)
    .bind(new.price)
    .bind(&new.isbn)
    .bind(new.published_date)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::NotFound("book"))
}

pub async fn delete_book(pool: &PgPool, id: Uuid) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(Error::NotFound("book"));
    }
    Ok(())
}

/// Absolute stock set for restocking, as opposed to the relative
/// reserve/release ledger operations.
pub async fn update_stock(pool: &PgPool, id: Uuid, new_stock: i32) -> Result<Book> {
    sqlx::query_as::<_, Book>(
        "UPDATE books SET stock = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(new_stock)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::NotFound("book"))
}

pub async fn find_by_isbn(pool: &PgPool, isbn: &str) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = $1")
        .bind(isbn)
        .fetch_optional(pool)
        .await?;
    Ok(book)
}

/// Inserts search results that are not yet in the catalog, keyed by ISBN.
/// Returns how many were added. Races with a concurrent import of the same
/// ISBN resolve via the unique index (`ON CONFLICT DO NOTHING`).
pub async fn import_books(pool: &PgPool, found: &[NewBook]) -> Result<usize> {
    let mut imported = 0;
    for new in found {
        let inserted = sqlx::query(
            "INSERT INTO books (id, title, author, description, price, stock, isbn, published_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now()) ON CONFLICT (isbn) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.author)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock)
        .bind(&new.isbn)
        .bind(new.published_date)
        .execute(pool)
        .await?
        .rows_affected();
        imported += inserted as usize;
    }
    Ok(imported)
}
