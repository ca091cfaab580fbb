//! Autodoc catalog: the search page lists aftermarket articles fitting a code.
//! In codes-only mode the first detail pages are also visited, since they list
//! the OE numbers each article replaces. Detail pages are fetched concurrently
//! and only within what is left of the provider's time budget, so a slow
//! detail page never costs the codes already read from the search page.

use crate::domain::entities::equivalent::{EquivalentCandidate, LookupMode};
use crate::domain::error::SourceError;
use crate::domain::ports::equivalence_provider::EquivalenceProvider;
use crate::infrastructure::http;
use crate::infrastructure::sources::extract::{join_url, strip_tags};
use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

pub const NAME: &str = "autodoc";
const DETAIL_PAGES: usize = 3;

static ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*listing-item\b[^"]*"([^>]*)>(.*?)<!--\s*/listing-item\s*-->"#)
        .expect("Invalid regex")
});
static BRAND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"data-brand="([^"]+)""#).expect("Invalid regex"));
static ARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*listing-item__article[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*listing-item__name[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*listing-item__price-new[^"]*"[^>]*>(.*?)</"#).expect("Invalid regex")
});
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"<a[^>]+href="([^"]+)""#).expect("Invalid regex"));
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+(?:data-src|src)="([^"]+)""#).expect("Invalid regex"));
static OE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<ul[^>]*class="[^"]*oe-numbers[^"]*"[^>]*>(.*?)</ul>"#).expect("Invalid regex")
});
static LI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<li[^>]*>(.*?)</li>").expect("Invalid regex"));
static LABEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:n[ºo°]?\s*de\s*art[ií]culo|art\.?\s*n[ºo°]?)\s*:?\s*").expect("Invalid regex"));

/// One search-page article, with the detail link when present.
#[derive(Debug, Clone, PartialEq)]
pub struct Listed {
    pub candidate: EquivalentCandidate,
    pub detail_url: Option<String>,
}

pub struct AutodocProvider {
    base_url: String,
    client: reqwest::Client,
    /// Wall-clock budget for one `candidates` call, search page included.
    budget: Duration,
}

impl AutodocProvider {
    pub fn new(client: reqwest::Client, budget: Duration) -> Self {
        Self {
            base_url: "https://www.autodoc.es".into(),
            client,
            budget,
        }
    }

    async fn detail_codes(&self, url: &str) -> Result<Vec<String>, SourceError> {
        let html = http::get_text(&self.client, NAME, url, &[]).await?;
        Ok(parse_oe_numbers(&html))
    }
}

pub fn parse_search(html: &str, base_url: &str) -> Vec<Listed> {
    ITEM.captures_iter(html)
        .filter_map(|item| {
            let attrs = item.get(1).map_or("", |m| m.as_str());
            let body = item.get(2).map_or("", |m| m.as_str());
            let code = ARTICLE
                .captures(body)
                .map(|c| LABEL_PREFIX.replace(&strip_tags(&c[1]), "").trim().to_string())
                .filter(|c| !c.is_empty())?;
            Some(Listed {
                candidate: EquivalentCandidate {
                    code,
                    brand: BRAND.captures(attrs).map(|c| strip_tags(&c[1])),
                    description: TITLE.captures(body).map(|c| strip_tags(&c[1])),
                    price_text: PRICE.captures(body).map(|c| strip_tags(&c[1])),
                    image_url: IMAGE.captures(body).and_then(|c| join_url(base_url, &c[1])),
                },
                detail_url: LINK.captures(body).and_then(|c| join_url(base_url, &c[1])),
            })
        })
        .collect()
}

/// Fetch every detail page concurrently, each cut off at `deadline`. Pages
/// that fail or run late are skipped; the others keep their input order.
pub async fn gather_detail_codes<F, Fut>(urls: Vec<String>, deadline: Duration, fetch: F) -> Vec<String>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<String>, SourceError>>,
{
    let pages = urls.into_iter().map(|url| {
        let page = fetch(url.clone());
        async move { (url, tokio::time::timeout(deadline, page).await) }
    });
    let mut codes = Vec::new();
    for (url, outcome) in join_all(pages).await {
        match outcome {
            Ok(Ok(found)) => codes.extend(found),
            Ok(Err(e)) => tracing::debug!(provider = NAME, url = %url, error = %e, "detail page skipped"),
            Err(_) => tracing::debug!(provider = NAME, url = %url, "detail page over budget"),
        }
    }
    codes
}

/// OE numbers listed on an article detail page.
pub fn parse_oe_numbers(html: &str) -> Vec<String> {
    OE_BLOCK
        .captures_iter(html)
        .flat_map(|block| {
            LI.captures_iter(block.get(1).map_or("", |m| m.as_str()))
                .map(|li| strip_tags(&li[1]))
                .collect::<Vec<_>>()
        })
        .filter(|code| !code.is_empty())
        .collect()
}

#[async_trait]
impl EquivalenceProvider for AutodocProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn candidates(
        &self,
        reference: &str,
        mode: LookupMode,
    ) -> Result<Vec<EquivalentCandidate>, SourceError> {
        let started = Instant::now();
        let html = http::get_text(
            &self.client,
            NAME,
            &format!("{}/search", self.base_url),
            &[("keyword", reference)],
        )
        .await?;
        let listed = parse_search(&html, &self.base_url);
        if listed.is_empty() && !html.contains("listing-wrap") {
            return Err(SourceError::ParseFailure(format!("{NAME}: no listing in search page")));
        }

        match mode {
            LookupMode::FullItem => Ok(listed.into_iter().map(|l| l.candidate).collect()),
            LookupMode::CodesOnly => {
                let details: Vec<String> = listed
                    .iter()
                    .filter_map(|l| l.detail_url.clone())
                    .take(DETAIL_PAGES)
                    .collect();
                let mut out: Vec<EquivalentCandidate> =
                    listed.into_iter().map(|l| EquivalentCandidate::code(l.candidate.code)).collect();
                let remaining = self.budget.saturating_sub(started.elapsed());
                let codes = gather_detail_codes(details, remaining, |url| async move {
                    self.detail_codes(&url).await
                })
                .await;
                out.extend(codes.into_iter().map(EquivalentCandidate::code));
                Ok(out)
            }
        }
    }
}
