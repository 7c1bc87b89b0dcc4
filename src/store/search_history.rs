//! Append-only log of search queries. Audit only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SearchEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub searched_at: DateTime<Utc>,
}

pub async fn record(pool: &PgPool, user_id: Uuid, query: &str) -> Result<SearchEntry> {
    let entry = sqlx::query_as::<_, SearchEntry>(
        "INSERT INTO search_history (id, user_id, query, searched_at) VALUES ($1, $2, $3, now()) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(query)
    .fetch_one(pool)
    .await?;
    Ok(entry)
}

pub async fn recent(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<SearchEntry>> {
    let entries = sqlx::query_as::<_, SearchEntry>(
        "SELECT * FROM search_history WHERE user_id = $1 ORDER BY searched_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}
