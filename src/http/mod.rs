//! HTTP surface: router, shared state, and the trusted-identity extractor.

pub mod books;
pub mod cart;
pub mod orders;
pub mod search;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::events::{OrderEvent, ORDERS_SUBJECT};
use crate::error::Error;
use crate::search::BookLookup;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub nats: Option<async_nats::Client>,
    pub lookup: Arc<dyn BookLookup>,
}

/// Authenticated user identity, supplied by the auth layer in front of this
/// service via the `X-User-Id` header. Trusted as-is; this core does not
/// re-validate it.
#[derive(Clone, Copy, Debug)]
pub struct UserId(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(UserId)
            .ok_or_else(|| Error::Validation("missing or invalid X-User-Id header".to_string()))
    }
}

pub fn router(state: AppState) -> Router {
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "bookstore"})) }),
        )
        .route("/api/v1/books", get(books::list).post(books::create))
        .route(
            "/api/v1/books/:id",
            get(books::get).put(books::update).delete(books::delete),
        )
        .route("/api/v1/books/:id/stock", put(books::update_stock))
        .route("/api/v1/cart", get(cart::get).delete(cart::clear))
        .route("/api/v1/cart/lines", post(cart::add_line))
        .route(
            "/api/v1/cart/lines/:book_id",
            put(cart::update_line).delete(cart::remove_line),
        )
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/orders", get(orders::list))
        .route("/api/v1/orders/:id", get(orders::get))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route("/api/v1/search", get(search::search))
        .route("/api/v1/search/history", get(search::history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Best-effort event publishing after a committed transaction. Publish
/// failures are logged and never fail the request.
pub(crate) async fn publish_order_event(state: &AppState, event: &OrderEvent) {
    let Some(nats) = &state.nats else { return };
    match serde_json::to_vec(event) {
        Ok(payload) => {
            if let Err(err) = nats.publish(ORDERS_SUBJECT, payload.into()).await {
                tracing::warn!(error = %err, "failed to publish order event");
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to serialize order event"),
    }
}
