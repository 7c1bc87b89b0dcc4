//! Postgres persistence. Multi-row invariants live in `checkout`; everything
//! here takes explicit executors so atomic scopes are visible at call sites.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod inventory;
pub mod search_history;
