//! External book-search collaborator.
//!
//! The core only sees the `BookLookup` trait; `GoogleBooks` is the production
//! implementation against the Google Books volumes API.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A search hit from the upstream service. `isbn` may be empty and
/// `published_date` absent when the upstream record is incomplete; the import
/// path filters those out.
#[derive(Debug, Clone, Serialize)]
pub struct FoundBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub isbn: String,
    pub published_date: Option<NaiveDate>,
    pub price: Decimal,
}

#[async_trait]
pub trait BookLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<FoundBook>>;
}

/// Google Books client. The base URL is configurable so tests and
/// self-hosted mirrors can point elsewhere.
pub struct GoogleBooks {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleBooks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BookLookup for GoogleBooks {
    async fn search(&self, query: &str) -> Result<Vec<FoundBook>> {
        let url = format!("{}/volumes", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::Lookup(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Lookup(e.to_string()))?;
        let volumes: VolumesResponse = response
            .json()
            .await
            .map_err(|e| Error::Lookup(e.to_string()))?;
        Ok(parse_volumes(volumes))
    }
}

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
    #[serde(rename = "saleInfo", default)]
    sale_info: SaleInfo,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(rename = "industryIdentifiers", default)]
    industry_identifiers: Vec<Identifier>,
}

#[derive(Debug, Deserialize)]
struct Identifier {
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
struct SaleInfo {
    #[serde(rename = "retailPrice")]
    retail_price: Option<RetailPrice>,
}

#[derive(Debug, Deserialize)]
struct RetailPrice {
    amount: Decimal,
}

fn parse_volumes(response: VolumesResponse) -> Vec<FoundBook> {
    response
        .items
        .into_iter()
        .map(|item| {
            let info = item.volume_info;
            FoundBook {
                title: info.title.unwrap_or_else(|| "Unknown".to_string()),
                author: if info.authors.is_empty() {
                    "Unknown".to_string()
                } else {
                    info.authors.join(", ")
                },
                description: info.description.unwrap_or_default(),
                isbn: info
                    .industry_identifiers
                    .into_iter()
                    .next()
                    .map(|i| i.identifier)
                    .unwrap_or_default(),
                published_date: info
                    .published_date
                    .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
                price: item
                    .sale_info
                    .retail_price
                    .map(|p| p.amount)
                    .unwrap_or(Decimal::ZERO),
            }
        })
        .collect()
}
