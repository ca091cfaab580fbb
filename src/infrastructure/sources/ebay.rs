//! eBay Browse API. Slow (OAuth handshake plus a heavy search endpoint), so it
//! is only queried on explicit opt-in. Also answers listing counts for
//! equivalent-code ranking.

use crate::domain::entities::price_sample::{most_common_category, SourceListing};
use crate::domain::error::SourceError;
use crate::domain::ports::listing_counter::ListingCounter;
use crate::domain::ports::price_source::{PriceBounds, PriceSource};
use crate::infrastructure::cache::session_cache::SessionCache;
use crate::infrastructure::http;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;

pub const ID: &str = "ebay";
const BOUNDS: PriceBounds = PriceBounds::new(3.0, 10000.0);
const SCOPE: &str = "https://api.ebay.com/oauth/api_scope";
const MAX_PAGE: usize = 200;

#[derive(Debug, Clone)]
pub struct EbayCredentials {
    pub client_id: String,
    pub client_secret: String,
}

pub struct EbaySource {
    api_url: String,
    marketplace: String,
    credentials: Option<EbayCredentials>,
    client: reqwest::Client,
    sessions: Arc<SessionCache>,
}

impl EbaySource {
    pub fn new(
        client: reqwest::Client,
        sessions: Arc<SessionCache>,
        credentials: Option<EbayCredentials>,
        marketplace: Option<String>,
    ) -> Self {
        Self {
            api_url: "https://api.ebay.com".into(),
            marketplace: marketplace.unwrap_or_else(|| "EBAY_ES".into()),
            credentials,
            client,
            sessions,
        }
    }

    async fn token(&self) -> Result<String, SourceError> {
        if let Some(token) = self.sessions.get(ID) {
            return Ok(token);
        }
        let creds = self
            .credentials
            .as_ref()
            .ok_or_else(|| SourceError::AuthFailure(format!("{ID}: no client credentials configured")))?;
        let resp = self
            .client
            .post(format!("{}/identity/v1/oauth2/token", self.api_url))
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", SCOPE)])
            .send()
            .await
            .map_err(|e| http::network_error(ID, e))?;
        http::check_status(ID, resp.status())?;
        let grant: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::ParseFailure(format!("{ID} token: {e}")))?;
        // Expire locally a minute before eBay does.
        let lifetime = grant.expires_in.saturating_sub(60).max(1);
        self.sessions.put_until(
            ID,
            &grant.access_token,
            Utc::now() + ChronoDuration::seconds(lifetime as i64),
        );
        tracing::debug!(source = ID, expires_in = grant.expires_in, "oauth token issued");
        Ok(grant.access_token)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<BrowseResponse, SourceError> {
        let token = self.token().await?;
        let limit = limit.clamp(1, MAX_PAGE).to_string();
        let resp = self
            .client
            .get(format!("{}/buy/browse/v1/item_summary/search", self.api_url))
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", self.marketplace.as_str())
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| http::network_error(ID, e))?;
        if let Err(e) = http::check_status(ID, resp.status()) {
            if matches!(e, SourceError::AuthFailure(_)) {
                self.sessions.invalidate(ID);
            }
            return Err(e);
        }
        let body = resp.text().await.map_err(|e| http::network_error(ID, e))?;
        parse_browse(&body)
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    7200
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub item_summaries: Vec<ItemSummary>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: Option<Amount>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, serde::Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub image_url: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_name: String,
}

pub fn parse_browse(body: &str) -> Result<BrowseResponse, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::ParseFailure(format!("{ID}: {e}")))
}

pub fn listing_from_browse(response: &BrowseResponse, limit: usize) -> SourceListing {
    let prices = response.item_summaries.iter().filter_map(|item| {
        let price = item.price.as_ref()?;
        if !price.currency.eq_ignore_ascii_case("EUR") {
            return None;
        }
        price.value.parse::<f64>().ok()
    });
    SourceListing {
        prices: BOUNDS.sanitize(prices, limit),
        images: response
            .item_summaries
            .iter()
            .filter_map(|i| i.image.as_ref().map(|img| img.image_url.clone()))
            .take(limit)
            .collect(),
        category: most_common_category(
            response
                .item_summaries
                .iter()
                .filter_map(|i| i.categories.first().map(|c| c.category_name.as_str())),
        ),
    }
}

#[async_trait]
impl PriceSource for EbaySource {
    fn id(&self) -> &str {
        ID
    }

    fn bounds(&self) -> PriceBounds {
        BOUNDS
    }

    async fn setup_session(&self, reference: &str) -> bool {
        match self.token().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(source = ID, reference, error = %e, "oauth handshake failed");
                false
            }
        }
    }

    async fn fetch_listing(&self, reference: &str, limit: usize) -> Result<SourceListing, SourceError> {
        let response = self.search(reference, limit).await?;
        Ok(listing_from_browse(&response, limit))
    }

    async fn is_available(&self) -> bool {
        self.credentials.is_some() && self.token().await.is_ok()
    }
}

#[async_trait]
impl ListingCounter for EbaySource {
    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn listing_count(&self, code: &str) -> Result<u64, SourceError> {
        Ok(self.search(code, 1).await?.total)
    }
}
