use crate::domain::entities::catalog_item::CatalogItem;
use crate::domain::entities::price_sample::{most_common_category, SourceListing};
use crate::domain::error::SourceError;
use crate::domain::ports::competitor_catalog::CompetitorCatalog;
use crate::domain::ports::price_source::{PriceBounds, PriceSource};
use crate::infrastructure::http;
use async_trait::async_trait;

pub const ID: &str = "ovoko";
const BOUNDS: PriceBounds = PriceBounds::new(5.0, 8000.0);
const PAGE_SIZE: usize = 100;

/// European used-parts aggregator with a public JSON search endpoint.
pub struct OvokoSource {
    base_url: String,
    client: reqwest::Client,
}

impl OvokoSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            base_url: "https://api.ovoko.com/v1".into(),
            client,
        }
    }

    async fn search(&self, reference: &str, limit: usize) -> Result<SearchResponse, SourceError> {
        let limit = limit.min(PAGE_SIZE).to_string();
        let resp = self
            .client
            .get(format!("{}/parts", self.base_url))
            .query(&[("query", reference), ("limit", limit.as_str()), ("currency", "EUR")])
            .send()
            .await
            .map_err(|e| http::network_error(ID, e))?;
        http::check_status(ID, resp.status())?;
        let body = resp.text().await.map_err(|e| http::network_error(ID, e))?;
        parse_response(&body)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<OvokoItem>,
}

#[derive(Debug, serde::Deserialize)]
pub struct OvokoItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: Option<OvokoPrice>,
    #[serde(default)]
    pub manufacturer_code: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub category: Option<OvokoCategory>,
}

#[derive(Debug, serde::Deserialize)]
pub struct OvokoPrice {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".into()
}

#[derive(Debug, serde::Deserialize)]
pub struct OvokoCategory {
    pub name: String,
}

pub fn parse_response(body: &str) -> Result<SearchResponse, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::ParseFailure(format!("{ID}: {e}")))
}

impl OvokoItem {
    /// Price in EUR; other currencies are dropped rather than converted.
    fn eur_price(&self) -> Option<f64> {
        self.price
            .as_ref()
            .filter(|p| p.currency.eq_ignore_ascii_case("EUR"))
            .map(|p| p.amount)
    }

    fn into_catalog_item(self) -> CatalogItem {
        let price = self.eur_price();
        CatalogItem {
            source: ID.to_string(),
            title: self.title,
            oem_code: self.manufacturer_code.filter(|c| !c.trim().is_empty()),
            price,
            url: self.url,
            image_url: self.photos.into_iter().next(),
            category: self.category.map(|c| c.name),
        }
    }
}

pub fn listing_from_response(response: &SearchResponse, limit: usize) -> SourceListing {
    SourceListing {
        prices: BOUNDS.sanitize(response.items.iter().filter_map(OvokoItem::eur_price), limit),
        images: response
            .items
            .iter()
            .filter_map(|i| i.photos.first().cloned())
            .take(limit)
            .collect(),
        category: most_common_category(
            response
                .items
                .iter()
                .filter_map(|i| i.category.as_ref().map(|c| c.name.as_str())),
        ),
    }
}

#[async_trait]
impl PriceSource for OvokoSource {
    fn id(&self) -> &str {
        ID
    }

    fn bounds(&self) -> PriceBounds {
        BOUNDS
    }

    async fn fetch_listing(&self, reference: &str, limit: usize) -> Result<SourceListing, SourceError> {
        let response = self.search(reference, limit).await?;
        Ok(listing_from_response(&response, limit))
    }

    async fn is_available(&self) -> bool {
        http::probe(&self.client, &format!("{}/health", self.base_url)).await
    }
}

#[async_trait]
impl CompetitorCatalog for OvokoSource {
    fn name(&self) -> &str {
        ID
    }

    async fn search_items(&self, reference: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let response = self.search(reference, PAGE_SIZE).await?;
        Ok(response.items.into_iter().map(OvokoItem::into_catalog_item).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
      "items": [
        {"title": "Alternador Clio", "price": {"amount": 95.0, "currency": "EUR"},
         "manufacturer_code": "0986424815", "url": "https://ovoko.es/p/1",
         "photos": ["https://img.ovoko.com/1.jpg"], "category": {"name": "Alternador"}},
        {"title": "Alternator", "price": {"amount": 80.0, "currency": "PLN"},
         "manufacturer_code": "0986424815", "photos": []},
        {"title": "Alternador", "price": {"amount": 2.0}, "category": {"name": "Alternador"}},
        {"title": "Sin precio"}
      ]
    }"#;

    #[test]
    fn test_listing_keeps_eur_in_bounds() {
        let response = parse_response(BODY).unwrap();
        let listing = listing_from_response(&response, 10);
        assert_eq!(listing.prices, vec![95.0]);
        assert_eq!(listing.category.as_deref(), Some("ALTERNADOR"));
        assert_eq!(listing.images.len(), 1);
    }

    #[test]
    fn test_catalog_items() {
        let items: Vec<CatalogItem> = parse_response(BODY)
            .unwrap()
            .items
            .into_iter()
            .map(OvokoItem::into_catalog_item)
            .collect();
        assert_eq!(items[0].oem_code.as_deref(), Some("0986424815"));
        assert_eq!(items[1].price, None);
        assert_eq!(items[3].oem_code, None);
    }

    #[test]
    fn test_garbage_is_parse_failure() {
        assert!(matches!(parse_response("<html>"), Err(SourceError::ParseFailure(_))));
    }
}
