//! Application configuration loaded from environment variables.

/// Service configuration with defaults suitable for local development.
///
/// Reads from environment variables:
/// - `DATABASE_URL` — Postgres connection string (required)
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8084`)
/// - `NATS_URL` — optional NATS server for order events
/// - `BOOKS_API_URL` — book-search upstream base URL
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub books_api_url: String,
}

const DEFAULT_BOOKS_API_URL: &str = "https://www.googleapis.com/books/v1";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8084),
            nats_url: std::env::var("NATS_URL").ok(),
            books_api_url: std::env::var("BOOKS_API_URL")
                .unwrap_or_else(|_| DEFAULT_BOOKS_API_URL.to_string()),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
