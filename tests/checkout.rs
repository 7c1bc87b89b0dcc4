//! Checkout transaction integration tests against a disposable Postgres.
//!
//! The container is shared across tests; isolation comes from per-test users
//! and books, so tests can run in parallel.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool};
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use bookstore::domain::book::{Book, NewBook};
use bookstore::domain::cart;
use bookstore::domain::order::OrderStatus;
use bookstore::store;
use bookstore::Error;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            pool.execute(include_str!("../migrations/0001_init.sql"))
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_pool() -> PgPool {
    let info = get_container_info().await;
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap()
}

/// Inserts a book with a unique ISBN. Prices are given in cents.
async fn seed_book(pool: &PgPool, price_cents: i64, stock: i32) -> Book {
    let isbn: String = Uuid::new_v4().simple().to_string()[..13].to_string();
    store::catalog::create_book(
        pool,
        &NewBook {
            title: "Test Book".to_string(),
            author: "Test Author".to_string(),
            description: String::new(),
            price: Decimal::new(price_cents, 2),
            stock,
            isbn,
            published_date: None,
        },
    )
    .await
    .unwrap()
}

async fn stock_of(pool: &PgPool, book_id: Uuid) -> i32 {
    store::catalog::get_book(pool, book_id).await.unwrap().stock
}

mod checkout_flow {
    use super::*;

    #[tokio::test]
    async fn checkout_snapshots_total_and_consumes_stock() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let book = seed_book(&pool, 1000, 5).await; // 10.00, stock 5

        let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, book.id, 3).await.unwrap();

        let lines = store::cart::lines(&pool, cart_row.id).await.unwrap();
        let cart_total = cart::total_price(&lines);

        let (order, order_lines) = store::checkout::checkout(&pool, user).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, Decimal::new(3000, 2));
        assert_eq!(order.total_price, cart_total);
        let line_sum: Decimal = order_lines.iter().map(|l| l.line_total()).sum();
        assert_eq!(line_sum, order.total_price);
        assert_eq!(order_lines.len(), 1);
        assert_eq!(order_lines[0].unit_price, Decimal::new(1000, 2));

        assert_eq!(stock_of(&pool, book.id).await, 2);

        // Lines are gone but the cart itself survives checkout.
        let remaining = store::cart::lines(&pool, cart_row.id).await.unwrap();
        assert!(remaining.is_empty());
        let same_cart = store::cart::ensure_cart(&pool, user).await.unwrap();
        assert_eq!(same_cart.id, cart_row.id);
    }

    #[tokio::test]
    async fn cancel_restores_stock_round_trip() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let book = seed_book(&pool, 1000, 5).await;

        let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, book.id, 3).await.unwrap();
        let (order, _) = store::checkout::checkout(&pool, user).await.unwrap();
        assert_eq!(stock_of(&pool, book.id).await, 2);

        let cancelled = store::checkout::cancel_order(&pool, user, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&pool, book.id).await, 5);

        // The order stays as a historical record with its lines untouched.
        let (fetched, lines) = store::checkout::get_order(&pool, user, order.id).await.unwrap();
        assert_eq!(fetched.total_price, Decimal::new(3000, 2));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn empty_cart_checkout_fails_without_side_effects() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        store::cart::ensure_cart(&pool, user).await.unwrap();

        let err = store::checkout::checkout(&pool, user).await.unwrap_err();
        assert!(matches!(err, Error::EmptyCart));
        assert!(store::checkout::list_orders(&pool, user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn checkout_without_cart_is_not_found() {
        let pool = get_pool().await;
        let err = store::checkout::checkout(&pool, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("cart")));
    }

    #[tokio::test]
    async fn one_bad_line_aborts_the_whole_checkout() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let good = seed_book(&pool, 1000, 5).await;
        let bad = seed_book(&pool, 500, 2).await;

        let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, good.id, 2).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, bad.id, 2).await.unwrap();

        // Stock drops after the lines were added, from another flow.
        store::catalog::update_stock(&pool, bad.id, 1).await.unwrap();

        let err = store::checkout::checkout(&pool, user).await.unwrap_err();
        match err {
            Error::InsufficientStock {
                book_id,
                available,
                requested,
            } => {
                assert_eq!(book_id, bad.id);
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Nothing moved: no order, both stocks intact, cart still populated.
        assert!(store::checkout::list_orders(&pool, user).await.unwrap().is_empty());
        assert_eq!(stock_of(&pool, good.id).await, 5);
        assert_eq!(stock_of(&pool, bad.id).await, 1);
        assert_eq!(store::cart::lines(&pool, cart_row.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unit_price_snapshot_survives_catalog_price_change() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let book = seed_book(&pool, 1000, 5).await;

        let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, book.id, 3).await.unwrap();
        let (order, _) = store::checkout::checkout(&pool, user).await.unwrap();

        store::catalog::update_book(
            &pool,
            book.id,
            &NewBook {
                title: book.title.clone(),
                author: book.author.clone(),
                description: book.description.clone(),
                price: Decimal::new(9999, 2),
                stock: book.stock,
                isbn: book.isbn.clone(),
                published_date: book.published_date,
            },
        )
        .await
        .unwrap();

        let (fetched, lines) = store::checkout::get_order(&pool, user, order.id).await.unwrap();
        assert_eq!(fetched.total_price, Decimal::new(3000, 2));
        assert_eq!(lines[0].unit_price, Decimal::new(1000, 2));
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn concurrent_checkouts_cannot_oversell() {
        let pool = get_pool().await;
        let book = seed_book(&pool, 1000, 5).await;

        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        for user in [user_a, user_b] {
            let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();
            store::cart::add_line(&pool, cart_row.id, book.id, 3).await.unwrap();
        }

        let pool_a = pool.clone();
        let pool_b = pool.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { store::checkout::checkout(&pool_a, user_a).await }),
            tokio::spawn(async move { store::checkout::checkout(&pool_b, user_b).await }),
        );
        let results = [a.unwrap(), b.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one checkout must win");
        let loser = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loser.as_ref().unwrap_err(),
            Error::InsufficientStock { .. }
        ));
        assert_eq!(stock_of(&pool, book.id).await, 2);
    }
}

mod order_state {
    use super::*;

    async fn placed_order(pool: &PgPool, user: Uuid, stock: i32) -> (Uuid, Uuid) {
        let book = seed_book(pool, 1000, stock).await;
        let cart_row = store::cart::ensure_cart(pool, user).await.unwrap();
        store::cart::add_line(pool, cart_row.id, book.id, 1).await.unwrap();
        let (order, _) = store::checkout::checkout(pool, user).await.unwrap();
        (order.id, book.id)
    }

    #[tokio::test]
    async fn externally_driven_transitions() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let (order_id, book_id) = placed_order(&pool, user, 3).await;

        let order = store::checkout::update_status(&pool, user, order_id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        let order = store::checkout::update_status(&pool, user, order_id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Completed);

        // Status updates never touch inventory.
        assert_eq!(stock_of(&pool, book_id).await, 2);
    }

    #[tokio::test]
    async fn cancelling_non_pending_order_fails_and_keeps_stock() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let (order_id, book_id) = placed_order(&pool, user, 3).await;

        store::checkout::update_status(&pool, user, order_id, OrderStatus::Processing)
            .await
            .unwrap();
        store::checkout::update_status(&pool, user, order_id, OrderStatus::Completed)
            .await
            .unwrap();

        let err = store::checkout::cancel_order(&pool, user, order_id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidStateTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled,
            }
        ));
        assert_eq!(stock_of(&pool, book_id).await, 2);
    }

    #[tokio::test]
    async fn cancelling_twice_fails_and_releases_once() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let (order_id, book_id) = placed_order(&pool, user, 3).await;

        store::checkout::cancel_order(&pool, user, order_id).await.unwrap();
        assert_eq!(stock_of(&pool, book_id).await, 3);

        let err = store::checkout::cancel_order(&pool, user, order_id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidStateTransition {
                from: OrderStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(stock_of(&pool, book_id).await, 3);
    }

    #[tokio::test]
    async fn status_endpoint_rejects_cancellation() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let (order_id, book_id) = placed_order(&pool, user, 3).await;

        let err = store::checkout::update_status(&pool, user, order_id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));
        // Stock untouched because the release path was not taken.
        assert_eq!(stock_of(&pool, book_id).await, 2);
    }
}

mod cart_mutations {
    use super::*;

    #[tokio::test]
    async fn ensure_cart_is_idempotent() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let first = store::cart::ensure_cart(&pool, user).await.unwrap();
        let second = store::cart::ensure_cart(&pool, user).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn add_line_accumulates_against_live_stock() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let book = seed_book(&pool, 1000, 5).await;
        let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();

        store::cart::add_line(&pool, cart_row.id, book.id, 2).await.unwrap();
        let line = store::cart::add_line(&pool, cart_row.id, book.id, 2).await.unwrap();
        assert_eq!(line.quantity, 4);

        let err = store::cart::add_line(&pool, cart_row.id, book.id, 2).await.unwrap_err();
        match err {
            Error::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 5);
                assert_eq!(requested, 6);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        // The failed add left the line as it was.
        let lines = store::cart::lines(&pool, cart_row.id).await.unwrap();
        assert_eq!(lines[0].quantity, 4);
    }

    #[tokio::test]
    async fn update_line_is_bounded_by_stock() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let book = seed_book(&pool, 1000, 5).await;
        let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, book.id, 1).await.unwrap();

        let line = store::cart::update_line(&pool, cart_row.id, book.id, 5).await.unwrap();
        assert_eq!(line.quantity, 5);

        let err = store::cart::update_line(&pool, cart_row.id, book.id, 6).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn remove_and_clear_lines() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let a = seed_book(&pool, 1000, 5).await;
        let b = seed_book(&pool, 500, 5).await;
        let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, a.id, 1).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, b.id, 2).await.unwrap();

        store::cart::remove_line(&pool, cart_row.id, a.id).await.unwrap();
        let err = store::cart::remove_line(&pool, cart_row.id, a.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("cart line")));

        store::cart::clear(&pool, cart_row.id).await.unwrap();
        assert!(store::cart::lines(&pool, cart_row.id).await.unwrap().is_empty());

        // Clearing twice is fine; the cart row still exists.
        store::cart::clear(&pool, cart_row.id).await.unwrap();
        let cart_again = store::cart::find_cart(&pool, user).await.unwrap();
        assert_eq!(cart_again.id, cart_row.id);
    }

    #[tokio::test]
    async fn cart_totals_follow_line_snapshot() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();
        let a = seed_book(&pool, 1000, 5).await; // 10.00
        let b = seed_book(&pool, 599, 5).await; // 5.99
        let cart_row = store::cart::ensure_cart(&pool, user).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, a.id, 3).await.unwrap();
        store::cart::add_line(&pool, cart_row.id, b.id, 1).await.unwrap();

        let lines = store::cart::lines(&pool, cart_row.id).await.unwrap();
        assert_eq!(cart::total_price(&lines), Decimal::new(3599, 2));
        assert_eq!(cart::total_items(&lines), 4);
    }
}

mod search_log {
    use super::*;

    #[tokio::test]
    async fn search_history_is_append_only_and_ordered() {
        let pool = get_pool().await;
        let user = Uuid::new_v4();

        store::search_history::record(&pool, user, "rust").await.unwrap();
        store::search_history::record(&pool, user, "tokio").await.unwrap();

        let entries = store::search_history::recent(&pool, user, 20).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.query == "rust"));
        assert!(entries.iter().any(|e| e.query == "tokio"));
        assert!(entries[0].searched_at >= entries[1].searched_at);
    }
}
