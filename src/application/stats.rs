use crate::domain::error::DomainError;
use crate::domain::values::price_summary::{filter_outliers, OutlierPolicy, PriceSummary};
use serde::Serialize;

/// Summary of a caller-supplied price list, plus the values the filter dropped.
#[derive(Debug, Clone, Serialize)]
pub struct PriceStats {
    pub summary: PriceSummary,
    pub outliers: Vec<f64>,
    pub fences: Option<(f64, f64)>,
}

pub struct StatsUseCase {
    policy: OutlierPolicy,
}

impl StatsUseCase {
    pub fn new(policy: OutlierPolicy) -> Self {
        Self { policy }
    }

    pub fn summarize(&self, prices: &[f64]) -> Result<PriceStats, DomainError> {
        let summary = PriceSummary::from_prices(prices, &self.policy)
            .ok_or_else(|| DomainError::Validation("at least one finite price is required".into()))?;
        let finite: Vec<f64> = prices.iter().copied().filter(|p| p.is_finite()).collect();
        let outcome = filter_outliers(&finite, &self.policy);
        Ok(PriceStats {
            summary,
            outliers: outcome.outliers,
            fences: outcome.fences,
        })
    }
}
