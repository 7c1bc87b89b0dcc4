//! Crate-wide error taxonomy and HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::order::OrderStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("book {book_id} has {available} in stock, {requested} requested")]
    InsufficientStock {
        book_id: Uuid,
        available: i32,
        requested: i32,
    },

    #[error("cart is empty")]
    EmptyCart,

    #[error("order cannot move from {from} to {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("book lookup failed: {0}")]
    Lookup(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InsufficientStock { .. } => StatusCode::CONFLICT,
            Error::EmptyCart => StatusCode::BAD_REQUEST,
            Error::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Lookup(_) => StatusCode::BAD_GATEWAY,
            Error::Database(err) => {
                tracing::error!(error = %err, "database error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
