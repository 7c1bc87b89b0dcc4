//! Checkout and order handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::OrderEvent;
use crate::domain::order::{Order, OrderLine, OrderStatus};
use crate::error::Result;
use crate::http::{publish_order_event, AppState, UserId};
use crate::store;

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

pub async fn checkout(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let (order, lines) = store::checkout::checkout(&state.db, user_id).await?;
    publish_order_event(
        &state,
        &OrderEvent::Placed {
            order_id: order.id,
            user_id,
            total_price: order.total_price,
        },
    )
    .await;
    Ok((StatusCode::CREATED, Json(OrderResponse { order, lines })))
}

pub async fn list(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(store::checkout::list_orders(&state.db, user_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>> {
    let (order, lines) = store::checkout::get_order(&state.db, user_id, id).await?;
    Ok(Json(OrderResponse { order, lines }))
}

pub async fn cancel(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>> {
    let order = store::checkout::cancel_order(&state.db, user_id, id).await?;
    publish_order_event(
        &state,
        &OrderEvent::Cancelled {
            order_id: order.id,
            user_id,
        },
    )
    .await;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    let order = store::checkout::update_status(&state.db, user_id, id, payload.status).await?;
    Ok(Json(order))
}
