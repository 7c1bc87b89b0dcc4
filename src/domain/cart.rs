//! Cart records and derived totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cart per user, created lazily by `store::cart::ensure_cart` and never
/// deleted; checkout and clear remove its lines only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub book_id: Uuid,
    pub quantity: i32,
}

/// A cart line joined with the live book row it points at. Prices here are
/// current catalog prices, not snapshots.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLineDetail {
    pub book_id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub stock: i32,
}

impl CartLineDetail {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of quantity × current price across the snapshot.
pub fn total_price(lines: &[CartLineDetail]) -> Decimal {
    lines.iter().map(CartLineDetail::line_total).sum()
}

/// Total number of copies in the cart, counting quantities.
pub fn total_items(lines: &[CartLineDetail]) -> i64 {
    lines.iter().map(|l| i64::from(l.quantity)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, unit_price: Decimal) -> CartLineDetail {
        CartLineDetail {
            book_id: Uuid::new_v4(),
            title: "A Book".into(),
            quantity,
            unit_price,
            stock: 100,
        }
    }

    #[test]
    fn test_totals_over_snapshot() {
        let lines = vec![
            line(3, Decimal::new(1000, 2)), // 3 × 10.00
            line(1, Decimal::new(599, 2)),  // 1 × 5.99
        ];
        assert_eq!(total_price(&lines), Decimal::new(3599, 2));
        assert_eq!(total_items(&lines), 4);
    }

    #[test]
    fn test_empty_cart_totals() {
        assert_eq!(total_price(&[]), Decimal::ZERO);
        assert_eq!(total_items(&[]), 0);
    }
}
