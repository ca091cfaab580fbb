use crate::domain::entities::catalog_item::CatalogItem;
use crate::domain::entities::price_sample::{most_common_category, SourceListing};
use crate::domain::error::SourceError;
use crate::domain::ports::competitor_catalog::CompetitorCatalog;
use crate::domain::ports::price_source::{PriceBounds, PriceSource};
use crate::infrastructure::http;
use async_trait::async_trait;

pub const ID: &str = "bparts";
const BOUNDS: PriceBounds = PriceBounds::new(5.0, 8000.0);

pub struct BpartsSource {
    base_url: String,
    client: reqwest::Client,
}

impl BpartsSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            base_url: "https://www.b-parts.com".into(),
            client,
        }
    }

    async fn search(&self, reference: &str) -> Result<Vec<BpartsResult>, SourceError> {
        let resp = self
            .client
            .get(format!("{}/api/search", self.base_url))
            .query(&[("q", reference), ("lang", "es")])
            .send()
            .await
            .map_err(|e| http::network_error(ID, e))?;
        http::check_status(ID, resp.status())?;
        let body = resp.text().await.map_err(|e| http::network_error(ID, e))?;
        parse_results(&body)
    }
}

#[derive(Debug, serde::Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<BpartsResult>,
}

#[derive(Debug, serde::Deserialize)]
pub struct BpartsResult {
    #[serde(default)]
    pub name: String,
    /// Euros, VAT included. Sent as a number or a string depending on the listing.
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub oem_reference: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl BpartsResult {
    pub fn price_eur(&self) -> Option<f64> {
        match self.price.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => super::extract::parse_price(s),
            _ => None,
        }
    }
}

pub fn parse_results(body: &str) -> Result<Vec<BpartsResult>, SourceError> {
    serde_json::from_str::<SearchResponse>(body)
        .map(|r| r.results)
        .map_err(|e| SourceError::ParseFailure(format!("{ID}: {e}")))
}

pub fn to_catalog_item(result: BpartsResult) -> CatalogItem {
    CatalogItem {
        source: ID.to_string(),
        price: result.price_eur(),
        title: result.name,
        oem_code: result.oem_reference.filter(|c| !c.trim().is_empty()),
        url: result.link,
        image_url: result.image,
        category: result.category,
    }
}

#[async_trait]
impl PriceSource for BpartsSource {
    fn id(&self) -> &str {
        ID
    }

    fn bounds(&self) -> PriceBounds {
        BOUNDS
    }

    async fn fetch_listing(&self, reference: &str, limit: usize) -> Result<SourceListing, SourceError> {
        let results = self.search(reference).await?;
        Ok(SourceListing {
            prices: BOUNDS.sanitize(results.iter().filter_map(BpartsResult::price_eur), limit),
            images: results.iter().filter_map(|r| r.image.clone()).take(limit).collect(),
            category: most_common_category(results.iter().filter_map(|r| r.category.as_deref())),
        })
    }

    async fn is_available(&self) -> bool {
        http::probe(&self.client, &self.base_url).await
    }
}

#[async_trait]
impl CompetitorCatalog for BpartsSource {
    fn name(&self) -> &str {
        ID
    }

    async fn search_items(&self, reference: &str) -> Result<Vec<CatalogItem>, SourceError> {
        Ok(self.search(reference).await?.into_iter().map(to_catalog_item).collect())
    }
}
