//! Domain events published to NATS after a transaction commits.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

pub const ORDERS_SUBJECT: &str = "bookstore.orders";

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed {
        order_id: Uuid,
        user_id: Uuid,
        total_price: Decimal,
    },
    Cancelled {
        order_id: Uuid,
        user_id: Uuid,
    },
}
