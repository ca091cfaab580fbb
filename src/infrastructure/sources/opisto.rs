//! Opisto: search results come back as an HTML fragment from an AJAX endpoint
//! guarded by a CSRF token. The token is scraped from the home page, kept in
//! the shared session cache and dropped as soon as the endpoint rejects it.

use super::extract::{is_fee_line, join_url, parse_price, strip_tags};
use crate::domain::entities::price_sample::{most_common_category, SourceListing};
use crate::domain::error::SourceError;
use crate::domain::ports::price_source::{PriceBounds, PriceSource};
use crate::infrastructure::cache::session_cache::SessionCache;
use crate::infrastructure::http;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

pub const ID: &str = "opisto";
const BOUNDS: PriceBounds = PriceBounds::new(5.0, 5000.0);

static CSRF_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+name="csrf-token"\s+content="([^"]+)""#).expect("Invalid regex")
});
static CSRF_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="_token"\s+value="([^"]+)""#).expect("Invalid regex")
});
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<[^>]*class="[^"]*\b(?:price|prix)\b[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+src="([^"]+)""#).expect("Invalid regex"));
static CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-piece="([^"]+)""#).expect("Invalid regex"));

pub struct OpistoSource {
    base_url: String,
    client: reqwest::Client,
    sessions: Arc<SessionCache>,
}

impl OpistoSource {
    pub fn new(client: reqwest::Client, sessions: Arc<SessionCache>) -> Self {
        Self {
            base_url: "https://www.opisto.fr".into(),
            client,
            sessions,
        }
    }

    async fn handshake(&self) -> Result<String, SourceError> {
        let html = http::get_text(&self.client, ID, &self.base_url, &[]).await?;
        let token = extract_csrf(&html)
            .ok_or_else(|| SourceError::AuthFailure(format!("{ID}: no csrf token on home page")))?;
        self.sessions.put(ID, &token);
        tracing::debug!(source = ID, "csrf session established");
        Ok(token)
    }

    async fn search_fragment(&self, reference: &str, token: &str) -> Result<String, SourceError> {
        let resp = self
            .client
            .post(format!("{}/ajax/recherche", self.base_url))
            .header("X-CSRF-TOKEN", token)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&[("reference", reference), ("_token", token)])
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
        http::detect_challenge(ID, &body)?;
        Ok(body)
    }
}

pub fn extract_csrf(html: &str) -> Option<String> {
    CSRF_META
        .captures(html)
        .or_else(|| CSRF_INPUT.captures(html))
        .map(|c| c[1].to_string())
}

pub fn parse_fragment(html: &str, base_url: &str, limit: usize) -> SourceListing {
    let raw = PRICE
        .captures_iter(html)
        .map(|c| strip_tags(&c[1]))
        .filter(|text| !is_fee_line(text))
        .filter_map(|text| parse_price(&text));
    SourceListing {
        prices: BOUNDS.sanitize(raw, limit),
        images: IMAGE
            .captures_iter(html)
            .filter_map(|c| join_url(base_url, &c[1]))
            .take(limit)
            .collect(),
        category: most_common_category(CATEGORY.captures_iter(html).filter_map(|c| c.get(1).map(|m| m.as_str()))),
    }
}

#[async_trait]
impl PriceSource for OpistoSource {
    fn id(&self) -> &str {
        ID
    }

    fn bounds(&self) -> PriceBounds {
        BOUNDS
    }

    async fn setup_session(&self, reference: &str) -> bool {
        if self.sessions.get(ID).is_some() {
            return true;
        }
        match self.handshake().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(source = ID, reference, error = %e, "session handshake failed");
                false
            }
        }
    }

    async fn fetch_listing(&self, reference: &str, limit: usize) -> Result<SourceListing, SourceError> {
        let token = match self.sessions.get(ID) {
            Some(token) => token,
            None => self.handshake().await?,
        };
        let fragment = self.search_fragment(reference, &token).await?;
        Ok(parse_fragment(&fragment, &self.base_url, limit))
    }

    async fn is_available(&self) -> bool {
        http::probe(&self.client, &self.base_url).await
    }
}
