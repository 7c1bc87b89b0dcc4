//! Book catalog record.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog entry. `stock` is only ever mutated through the inventory
/// operations in `store::inventory` or the admin stock endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub isbn: String,
    pub published_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new book, used by the catalog CRUD and the
/// search-import path.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub isbn: String,
    pub published_date: Option<NaiveDate>,
}
