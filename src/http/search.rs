//! Book-search proxy: queries the external lookup service, records the
//! query, and imports previously unknown books into the catalog.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::domain::book::NewBook;
use crate::error::{Error, Result};
use crate::http::{AppState, UserId};
use crate::search::FoundBook;
use crate::store::{catalog, search_history};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<FoundBook>>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::Validation("query parameter \"q\" is required".to_string()))?;

    let found = state.lookup.search(query).await?;
    search_history::record(&state.db, user_id, query).await?;

    // Only results with a usable ISBN and publication date enter the catalog.
    let importable: Vec<NewBook> = found
        .iter()
        .filter(|f| !f.isbn.is_empty() && f.published_date.is_some())
        .map(|f| NewBook {
            title: f.title.clone(),
            author: f.author.clone(),
            description: f.description.clone(),
            price: f.price,
            stock: 0,
            isbn: f.isbn.clone(),
            published_date: f.published_date,
        })
        .collect();
    let imported = catalog::import_books(&state.db, &importable).await?;
    if imported > 0 {
        tracing::debug!(imported, query, "imported search results into catalog");
    }

    Ok(Json(found))
}

pub async fn history(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<search_history::SearchEntry>>> {
    Ok(Json(search_history::recent(&state.db, user_id, 20).await?))
}
