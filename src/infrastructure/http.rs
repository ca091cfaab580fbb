use crate::domain::error::{DomainError, SourceError};
use reqwest::StatusCode;
use std::time::Duration;

/// Several catalogs serve an empty page to non-browser agents.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Markers of interstitial challenge pages. A bare "captcha" is not one:
/// ordinary storefronts load reCAPTCHA scripts for their forms.
const CHALLENGE_MARKERS: &[&str] = &[
    "cf-chl",
    "cf-challenge",
    "challenge-platform",
    "<title>just a moment",
    "captcha-delivery.com",
    "are you a robot",
];

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, DomainError> {
    reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| DomainError::Config(format!("HTTP client: {e}")))
}

/// Map a non-success status to the per-source error taxonomy.
pub fn check_status(source: &str, status: StatusCode) -> Result<(), SourceError> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status.as_u16() {
        429 => SourceError::RateLimited(format!("{source} returned 429")),
        401 | 403 | 419 => SourceError::AuthFailure(format!("{source} returned {status}")),
        _ => SourceError::ProviderUnavailable(format!("{source} returned {status}")),
    })
}

/// Bot challenges come back as 200 pages; detect them before parsing.
pub fn detect_challenge(source: &str, body: &str) -> Result<(), SourceError> {
    let head: String = body.chars().take(4096).collect::<String>().to_lowercase();
    match CHALLENGE_MARKERS.iter().find(|m| head.contains(*m)) {
        Some(marker) => Err(SourceError::RateLimited(format!("{source} served a bot challenge ({marker})"))),
        None => Ok(()),
    }
}

pub fn network_error(source: &str, e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::ProviderUnavailable(format!("{source} timed out"))
    } else {
        SourceError::ProviderUnavailable(format!("{source}: {e}"))
    }
}

/// GET `url` and return the body as text, mapped through the taxonomy.
pub async fn get_text(
    client: &reqwest::Client,
    source: &str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, SourceError> {
    let resp = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| network_error(source, e))?;
    check_status(source, resp.status())?;
    let body = resp.text().await.map_err(|e| network_error(source, e))?;
    detect_challenge(source, &body)?;
    Ok(body)
}

/// Reachability probe. Any HTTP answer below 500 counts.
pub async fn probe(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(resp) => resp.status().as_u16() < 500,
        Err(e) => {
            tracing::debug!(url, error = %e, "probe failed");
            false
        }
    }
}
