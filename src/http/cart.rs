//! Cart handlers. `ensure_cart` runs here at the boundary so the store's
//! cart operations never create carts implicitly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::cart::{self, CartLine, CartLineDetail};
use crate::error::Result;
use crate::http::{AppState, UserId};
use crate::store;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: Uuid,
    pub lines: Vec<CartLineDetail>,
    pub total_price: Decimal,
    pub total_items: i64,
}

pub async fn get(State(state): State<AppState>, UserId(user_id): UserId) -> Result<Json<CartResponse>> {
    let cart = store::cart::ensure_cart(&state.db, user_id).await?;
    let lines = store::cart::lines(&state.db, cart.id).await?;
    let total_price = cart::total_price(&lines);
    let total_items = cart::total_items(&lines);
    Ok(Json(CartResponse {
        id: cart.id,
        lines,
        total_price,
        total_items,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddLineRequest {
    pub book_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

pub async fn add_line(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(payload): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<CartLine>)> {
    payload.validate()?;
    let cart = store::cart::ensure_cart(&state.db, user_id).await?;
    let line = store::cart::add_line(&state.db, cart.id, payload.book_id, payload.quantity).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLineRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

pub async fn update_line(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(book_id): Path<Uuid>,
    Json(payload): Json<UpdateLineRequest>,
) -> Result<Json<CartLine>> {
    payload.validate()?;
    let cart = store::cart::find_cart(&state.db, user_id).await?;
    let line = store::cart::update_line(&state.db, cart.id, book_id, payload.quantity).await?;
    Ok(Json(line))
}

pub async fn remove_line(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode> {
    let cart = store::cart::find_cart(&state.db, user_id).await?;
    store::cart::remove_line(&state.db, cart.id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(State(state): State<AppState>, UserId(user_id): UserId) -> Result<StatusCode> {
    let cart = store::cart::ensure_cart(&state.db, user_id).await?;
    store::cart::clear(&state.db, cart.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
