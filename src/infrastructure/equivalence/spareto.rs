use crate::domain::entities::equivalent::{EquivalentCandidate, LookupMode};
use crate::domain::error::SourceError;
use crate::domain::ports::equivalence_provider::EquivalenceProvider;
use crate::infrastructure::http;
use crate::infrastructure::sources::extract::{join_url, strip_tags};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

pub const NAME: &str = "spareto";

static CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<article[^>]*class="[^"]*product-card[^"]*"[^>]*>(.*?)</article>"#).expect("Invalid regex")
});
static CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*product-card__code[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static BRAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*product-card__brand[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*product-card__title[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*product-card__price[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+src="([^"]+)""#).expect("Invalid regex"));

pub struct SparetoProvider {
    base_url: String,
    client: reqwest::Client,
}

impl SparetoProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            base_url: "https://spareto.com".into(),
            client,
        }
    }
}

pub fn parse_search(html: &str, base_url: &str) -> Vec<EquivalentCandidate> {
    CARD.captures_iter(html)
        .filter_map(|card| {
            let body = card.get(1).map_or("", |m| m.as_str());
            let code = CODE.captures(body).map(|c| strip_tags(&c[1])).filter(|c| !c.is_empty())?;
            Some(EquivalentCandidate {
                code,
                brand: BRAND.captures(body).map(|c| strip_tags(&c[1])),
                description: TITLE.captures(body).map(|c| strip_tags(&c[1])),
                price_text: PRICE.captures(body).map(|c| strip_tags(&c[1])),
                image_url: IMAGE.captures(body).and_then(|c| join_url(base_url, &c[1])),
            })
        })
        .collect()
}

#[async_trait]
impl EquivalenceProvider for SparetoProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn candidates(
        &self,
        reference: &str,
        mode: LookupMode,
    ) -> Result<Vec<EquivalentCandidate>, SourceError> {
        let html = http::get_text(
            &self.client,
            NAME,
            &format!("{}/search", self.base_url),
            &[("keywords", reference)],
        )
        .await?;
        let found = parse_search(&html, &self.base_url);
        Ok(match mode {
            LookupMode::FullItem => found,
            LookupMode::CodesOnly => found.into_iter().map(|c| EquivalentCandidate::code(c.code)).collect(),
        })
    }
}
