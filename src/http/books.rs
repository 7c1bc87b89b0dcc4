//! Catalog handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::book::{Book, NewBook};
use crate::error::{Error, Result};
use crate::http::AppState;
use crate::store::catalog;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BookPayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: i32,
    #[validate(length(min = 10, max = 13))]
    pub isbn: String,
    pub published_date: Option<NaiveDate>,
}

impl BookPayload {
    fn into_new_book(self) -> Result<NewBook> {
        self.validate()?;
        if self.price < Decimal::ZERO {
            return Err(Error::Validation("price must not be negative".to_string()));
        }
        Ok(NewBook {
            title: self.title,
            author: self.author,
            description: self.description,
            price: self.price,
            stock: self.stock,
            isbn: self.isbn,
            published_date: self.published_date,
        })
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Book>>> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let (books, total) = catalog::list_books(&state.db, page, per_page).await?;
    Ok(Json(PaginatedResponse {
        data: books,
        total,
        page,
    }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Book>> {
    Ok(Json(catalog::get_book(&state.db, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<Book>)> {
    let book = catalog::create_book(&state.db, &payload.into_new_book()?).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<Book>> {
    let book = catalog::update_book(&state.db, id, &payload.into_new_book()?).await?;
    Ok(Json(book))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    catalog::delete_book(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStockRequest {
    #[validate(range(min = 0))]
    pub stock: i32,
}

pub async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStockRequest>,
) -> Result<Json<Book>> {
    payload.validate()?;
    let book = catalog::update_stock(&state.db, id, payload.stock).await?;
    Ok(Json(book))
}
