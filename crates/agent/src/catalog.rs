//! Gift catalog lookups.
//!
//! `RapidApiCatalog` queries the real-time Amazon data API and filters the
//! results to the configured price window. Whenever the API is unusable (no
//! key, transport failure, bad status, undecodable body) it answers from
//! `FallbackCatalog` so a call never stalls on a dead upstream.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use santa_core::config::GiftConfig;
use santa_core::domain::gift::{truncate_chars, Gift};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

const MAX_SCANNED_PRODUCTS: usize = 10;
const MAX_RESULTS: usize = 3;
const DESCRIPTION_LIMIT: usize = 200;
const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x300";

#[async_trait]
pub trait GiftSearch: Send + Sync {
    /// Returns catalog products for `query`. Ids are left at zero; the caller
    /// numbers the options it presents.
    async fn search(&self, query: &str) -> Vec<Gift>;

    /// `true` when results come from a live upstream rather than canned data.
    fn is_live(&self) -> bool;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("rapidapi key is not configured")]
    MissingApiKey,
    #[error("rapidapi request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rapidapi returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Clone, Debug)]
pub struct RapidApiCatalog {
    client: reqwest::Client,
    base_url: String,
    host: String,
    api_key: Option<SecretString>,
    min_price: Decimal,
    max_price: Decimal,
    fallback: FallbackCatalog,
}

impl RapidApiCatalog {
    pub fn from_config(config: &GiftConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("https://{}", config.rapidapi_host),
            host: config.rapidapi_host.clone(),
            api_key: config.rapidapi_key.clone().filter(|_| config.has_api_key()),
            min_price: config.min_price,
            max_price: config.max_price,
            fallback: FallbackCatalog,
        })
    }

    /// Points requests at a different origin while keeping the
    /// `x-rapidapi-host` header.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn fetch(&self, query: &str) -> Result<Vec<Gift>, CatalogError> {
        let api_key = self.api_key.as_ref().ok_or(CatalogError::MissingApiKey)?;
        let url = format!("{}/search", self.base_url);

        debug!(
            event_name = "catalog.rapidapi.request",
            query = %query,
            url = %url,
            "searching rapidapi catalog"
        );

        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", api_key.expose_secret()) // ubs:ignore
            .query(&[
                ("query", query),
                ("page", "1"),
                ("country", "US"),
                ("sort_by", "RELEVANCE"),
                ("product_condition", "ALL"),
                ("is_prime", "false"),
                ("deals_and_discounts", "NONE"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status: status.as_u16(), body });
        }

        let payload: Value = response.json().await?;
        let products = parse_products(&payload, self.min_price, self.max_price);

        info!(
            event_name = "catalog.rapidapi.results",
            query = %query,
            result_count = products.len(),
            "rapidapi catalog search completed"
        );
        Ok(products)
    }
}

#[async_trait]
impl GiftSearch for RapidApiCatalog {
    async fn search(&self, query: &str) -> Vec<Gift> {
        match self.fetch(query).await {
            Ok(products) => products,
            Err(CatalogError::MissingApiKey) => {
                warn!(
                    event_name = "catalog.fallback",
                    reason = "missing_api_key",
                    "rapidapi key not configured, using fallback catalog"
                );
                self.fallback.products(query)
            }
            Err(error) => {
                warn!(
                    event_name = "catalog.fallback",
                    reason = "upstream_error",
                    error = %error,
                    "rapidapi search failed, using fallback catalog"
                );
                self.fallback.products(query)
            }
        }
    }

    fn is_live(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Extracts up to three giftable products from a RapidAPI search payload.
///
/// Only the first ten listings are considered. Listings without a title or
/// photo are dropped, as are listings whose dollar price falls outside
/// `[min_price, max_price]`. Prices that cannot be parsed are kept.
pub fn parse_products(payload: &Value, min_price: Decimal, max_price: Decimal) -> Vec<Gift> {
    let listings = payload
        .pointer("/data/products")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut products = Vec::new();
    for item in listings.iter().take(MAX_SCANNED_PRODUCTS) {
        let title = string_field(item, "product_title");
        let image = string_field(item, "product_photo");
        if title.is_empty() || image.is_empty() {
            continue;
        }

        let price = string_field(item, "product_price");
        if let Some(amount) = parse_dollar_amount(&price) {
            if amount < min_price || amount > max_price {
                continue;
            }
        }

        let asin = string_field(item, "asin");
        let url = match string_field(item, "product_url") {
            url if !url.is_empty() => url,
            _ if !asin.is_empty() => format!("https://www.amazon.com/dp/{asin}"),
            _ => "#".to_string(),
        };
        let description = match string_field(item, "product_description") {
            text if !text.is_empty() => truncate_chars(&text, DESCRIPTION_LIMIT),
            _ => format!("{title} - Great gift for kids!"),
        };

        products.push(Gift {
            id: 0,
            price: if price.is_empty() { "Price not available".to_string() } else { price },
            rating: string_field(item, "product_star_rating"),
            title,
            image,
            url,
            description,
            asin,
        });

        if products.len() >= MAX_RESULTS {
            break;
        }
    }

    products
}

/// `"$1,299.99 list"` → `1299.99`. Returns `None` when there is no `$` or the
/// leading token is not a number.
pub fn parse_dollar_amount(price: &str) -> Option<Decimal> {
    if !price.contains('$') {
        return None;
    }
    let cleaned = price.replace(['$', ','], "");
    let token = cleaned.split_whitespace().next()?;
    Decimal::from_str(token).ok()
}

fn string_field(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}

/// Canned products used when the live catalog is unavailable.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackCatalog;

impl FallbackCatalog {
    pub fn products(&self, query: &str) -> Vec<Gift> {
        let normalized = query.to_lowercase();

        if normalized.contains("lego") {
            return vec![
                canned(
                    "LEGO Classic Creative Bricks Set",
                    "$29.99",
                    "LEGO+Set",
                    "Build anything you can imagine with this classic LEGO set!",
                ),
                canned(
                    "LEGO City Police Station",
                    "$79.99",
                    "Police+Station",
                    "Complete police station with vehicles and minifigures",
                ),
                canned(
                    "LEGO Friends Heartlake City",
                    "$49.99",
                    "LEGO+Friends",
                    "Build and play in Heartlake City with friends",
                ),
            ];
        }

        if normalized.contains("doll") {
            return vec![
                canned(
                    "American Girl Doll - Holiday Edition",
                    "$98.00",
                    "American+Girl",
                    "Beautiful holiday-themed American Girl doll",
                ),
                canned(
                    "Barbie Dreamhouse Playset",
                    "$89.99",
                    "Barbie+Dreamhouse",
                    "Three-story Barbie dreamhouse with elevator",
                ),
                canned(
                    "Baby Alive Doll",
                    "$34.99",
                    "Baby+Alive",
                    "Interactive baby doll that eats, drinks, and more",
                ),
            ];
        }

        vec![canned(
            &format!("Wonderful {}", title_case(query)),
            "$49.99",
            "Gift",
            &format!("A perfect {query} for Christmas!"),
        )]
    }
}

#[async_trait]
impl GiftSearch for FallbackCatalog {
    async fn search(&self, query: &str) -> Vec<Gift> {
        self.products(query)
    }

    fn is_live(&self) -> bool {
        false
    }
}

fn canned(title: &str, price: &str, image_text: &str, description: &str) -> Gift {
    Gift {
        id: 0,
        title: title.to_string(),
        price: price.to_string(),
        image: format!("{PLACEHOLDER_IMAGE}?text={image_text}"),
        url: "#".to_string(),
        description: description.to_string(),
        rating: String::new(),
        asin: String::new(),
    }
}

/// Capitalizes the first letter of every word, lowercasing the rest.
fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for ch in value.chars() {
        if previous_is_letter {
            output.extend(ch.to_lowercase());
        } else {
            output.extend(ch.to_uppercase());
        }
        previous_is_letter = ch.is_alphabetic();
    }
    output
}
