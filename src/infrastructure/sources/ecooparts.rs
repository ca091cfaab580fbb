use super::extract::{is_fee_line, join_url, parse_price, strip_tags};
use crate::domain::entities::catalog_item::CatalogItem;
use crate::domain::entities::price_sample::{most_common_category, SourceListing};
use crate::domain::error::SourceError;
use crate::domain::ports::competitor_catalog::CompetitorCatalog;
use crate::domain::ports::price_source::{PriceBounds, PriceSource};
use crate::infrastructure::http;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

pub const ID: &str = "ecooparts";
const BOUNDS: PriceBounds = PriceBounds::new(5.0, 5000.0);

static CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<article[^>]*class="[^"]*product-card[^"]*"([^>]*)>(.*?)</article>"#).expect("Invalid regex")
});
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h[23][^>]*>(.*?)</h[23]>").expect("Invalid regex"));
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<[^>]*class="[^"]*\bprice\b[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static OEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"data-oem="([^"]*)""#).expect("Invalid regex"));
static CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-category="([^"]*)""#).expect("Invalid regex"));
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"<a[^>]+href="([^"]+)""#).expect("Invalid regex"));
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+(?:data-src|src)="([^"]+)""#).expect("Invalid regex"));

/// Spanish used-parts marketplace. Search results are server-rendered cards
/// carrying the OEM code and category as data attributes.
pub struct EcoopartsSource {
    base_url: String,
    client: reqwest::Client,
}

impl EcoopartsSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            base_url: "https://www.ecooparts.com".into(),
            client,
        }
    }

    async fn search_page(&self, reference: &str) -> Result<String, SourceError> {
        http::get_text(
            &self.client,
            ID,
            &format!("{}/recambios-automovil-segunda-mano/", self.base_url),
            &[("qry", reference)],
        )
        .await
    }
}

/// Product cards of a search page. Cards whose price line is a fee keep a
/// `None` price.
pub fn parse_cards(html: &str, base_url: &str) -> Vec<CatalogItem> {
    CARD.captures_iter(html)
        .map(|card| {
            let attrs = card.get(1).map_or("", |m| m.as_str());
            let body = card.get(2).map_or("", |m| m.as_str());
            let price_text = PRICE.captures(body).map(|c| strip_tags(&c[1]));
            let price = price_text
                .as_deref()
                .filter(|t| !is_fee_line(t))
                .and_then(parse_price);
            CatalogItem {
                source: ID.to_string(),
                title: TITLE.captures(body).map(|c| strip_tags(&c[1])).unwrap_or_default(),
                oem_code: OEM
                    .captures(attrs)
                    .or_else(|| OEM.captures(body))
                    .map(|c| c[1].trim().to_string())
                    .filter(|s| !s.is_empty()),
                price,
                url: LINK.captures(body).and_then(|c| join_url(base_url, &c[1])),
                image_url: IMAGE.captures(body).and_then(|c| join_url(base_url, &c[1])),
                category: CATEGORY
                    .captures(attrs)
                    .map(|c| strip_tags(&c[1]))
                    .filter(|s| !s.is_empty()),
            }
        })
        .collect()
}

pub fn listing_from_cards(cards: &[CatalogItem], limit: usize) -> SourceListing {
    SourceListing {
        prices: BOUNDS.sanitize(cards.iter().filter_map(|c| c.price), limit),
        images: cards.iter().filter_map(|c| c.image_url.clone()).take(limit).collect(),
        category: most_common_category(cards.iter().filter_map(|c| c.category.as_deref())),
    }
}

#[async_trait]
impl PriceSource for EcoopartsSource {
    fn id(&self) -> &str {
        ID
    }

    fn bounds(&self) -> PriceBounds {
        BOUNDS
    }

    async fn fetch_listing(&self, reference: &str, limit: usize) -> Result<SourceListing, SourceError> {
        let html = self.search_page(reference).await?;
        let cards = parse_cards(&html, &self.base_url);
        if cards.is_empty() && !html.contains("product-list") {
            return Err(SourceError::ParseFailure(format!("{ID}: no result list in page")));
        }
        Ok(listing_from_cards(&cards, limit))
    }

    async fn is_available(&self) -> bool {
        http::probe(&self.client, &self.base_url).await
    }
}

#[async_trait]
impl CompetitorCatalog for EcoopartsSource {
    fn name(&self) -> &str {
        ID
    }

    async fn search_items(&self, reference: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let html = self.search_page(reference).await?;
        Ok(parse_cards(&html, &self.base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="product-list">
  <article class="product-card" data-oem="0986424815" data-category="Alternador">
    <a href="/pieza/alternador-renault-clio-123"><img data-src="https://img.ecooparts.com/1.jpg"></a>
    <h3>Alternador RENAULT CLIO III</h3>
    <span class="price">89,90&nbsp;&euro;</span>
  </article>
  <article class="product-card" data-oem="0986424815X" data-category="Alternador">
    <a href="/pieza/alternador-456"></a>
    <h3>Alternador</h3>
    <span class="price">1.120,00 €</span>
  </article>
  <article class="product-card" data-category="Faro delantero">
    <h2>Faro</h2>
    <span class="price">Gastos de envío 6,95 €</span>
  </article>
</div>"#;

    #[test]
    fn test_parse_cards() {
        let cards = parse_cards(PAGE, "https://www.ecooparts.com");
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].title, "Alternador RENAULT CLIO III");
        assert_eq!(cards[0].oem_code.as_deref(), Some("0986424815"));
        assert_eq!(cards[0].price, Some(89.9));
        assert_eq!(
            cards[0].url.as_deref(),
            Some("https://www.ecooparts.com/pieza/alternador-renault-clio-123")
        );
        assert_eq!(cards[1].price, Some(1120.0));
        assert_eq!(cards[2].price, None, "fee line is not an item price");
        assert_eq!(cards[2].oem_code, None);
    }

    #[test]
    fn test_listing_from_cards() {
        let cards = parse_cards(PAGE, "https://www.ecooparts.com");
        let listing = listing_from_cards(&cards, 10);
        assert_eq!(listing.prices, vec![89.9, 1120.0]);
        assert_eq!(listing.category.as_deref(), Some("ALTERNADOR"));
        assert_eq!(listing.images, vec!["https://img.ecooparts.com/1.jpg"]);
    }
}
