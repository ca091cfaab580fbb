use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Every source answered (or failed) and no price or match was found.
    /// `failures` lists the per-source errors so callers can tell an empty
    /// market apart from a fully broken one.
    #[error("No results for {reference} ({} source failures)", failures.len())]
    AggregationEmpty {
        reference: String,
        failures: Vec<String>,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<String> for DomainError {
    fn from(s: String) -> Self {
        DomainError::Database(s)
    }
}

impl From<&str> for DomainError {
    fn from(s: &str) -> Self {
        DomainError::Validation(s.to_string())
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Database(e.to_string())
    }
}

/// Failure of a single external source. Never escapes the source boundary:
/// it is flattened into the error field of that source's result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Network error, timeout, non-2xx response or a crashed unit.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// The response arrived but nothing could be extracted from it.
    #[error("parse failure: {0}")]
    ParseFailure(String),
    /// Bot challenge or HTTP 429.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Session or token rejected, expired or missing.
    #[error("auth failure: {0}")]
    AuthFailure(String),
}

impl SourceError {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::ProviderUnavailable(_) => "provider_unavailable",
            SourceError::ParseFailure(_) => "parse_failure",
            SourceError::RateLimited(_) => "rate_limited",
            SourceError::AuthFailure(_) => "auth_failure",
        }
    }
}
