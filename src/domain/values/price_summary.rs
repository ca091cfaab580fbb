//! Price statistics with an asymmetric IQR outlier filter.
//!
//! Outliers are values outside `[Q1 - lower_k·IQR, Q3 + upper_k·IQR]`. The upper
//! fence is tighter than the lower one: in second-hand part listings a price far
//! above the pack is far more often a listing error (wrong unit, whole engine
//! instead of a sensor) than a price far below it.
//!
//! Filtering never invents values: the clean list is always an order-preserving
//! subset of the input.

use serde::{Deserialize, Serialize};

/// Tunable constants of the outlier filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierPolicy {
    /// Multiplier applied to the IQR below Q1.
    pub lower_k: f64,
    /// Multiplier applied to the IQR above Q3.
    pub upper_k: f64,
    /// Below this many samples the filter is the identity.
    pub min_samples: usize,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        Self {
            lower_k: 1.5,
            upper_k: 1.125,
            min_samples: 4,
        }
    }
}

/// Closed numeric range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    fn of(values: &[f64]) -> Option<Self> {
        let mut iter = values.iter().copied().filter(|v| v.is_finite());
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(PriceRange { min, max })
    }
}

/// Outcome of [`filter_outliers`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub clean: Vec<f64>,
    pub outliers: Vec<f64>,
    /// `(lower, upper)` fences, `None` when the filter did not run.
    pub fences: Option<(f64, f64)>,
}

/// Descriptive statistics of a price list. Central values describe the
/// outlier-free subset; `original_range` keeps the raw spread for context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub sample_count: usize,
    pub outliers_removed_count: usize,
    pub original_range: PriceRange,
    pub clean_range: PriceRange,
}

impl PriceSummary {
    /// Summarize a price list. Returns `None` when there is no finite value.
    pub fn from_prices(prices: &[f64], policy: &OutlierPolicy) -> Option<Self> {
        let finite: Vec<f64> = prices.iter().copied().filter(|p| p.is_finite()).collect();
        let original_range = PriceRange::of(&finite)?;
        let outcome = filter_outliers(&finite, policy);
        let clean_range = PriceRange::of(&outcome.clean)?;

        Some(PriceSummary {
            mean: mean(&outcome.clean)?,
            median: median(&outcome.clean)?,
            min: clean_range.min,
            max: clean_range.max,
            stddev: sample_stddev(&outcome.clean),
            sample_count: finite.len(),
            outliers_removed_count: outcome.outliers.len(),
            original_range,
            clean_range,
        })
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted(values);
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    Some(if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    })
}

/// Sample standard deviation (n - 1 denominator). Zero for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Quantile with linear interpolation between order statistics of `sorted`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Split `prices` into clean values and outliers.
///
/// Identity below `policy.min_samples`. If every value would be flagged the
/// filter is abandoned and the input comes back untouched with no outliers.
pub fn filter_outliers(prices: &[f64], policy: &OutlierPolicy) -> FilterOutcome {
    let untouched = || FilterOutcome {
        clean: prices.to_vec(),
        outliers: Vec::new(),
        fences: None,
    };

    if prices.len() < policy.min_samples.max(1) {
        return untouched();
    }

    let s = sorted(prices);
    let (Some(q1), Some(q3)) = (quantile(&s, 0.25), quantile(&s, 0.75)) else {
        return untouched();
    };
    let iqr = q3 - q1;
    let lower = q1 - policy.lower_k * iqr;
    let upper = q3 + policy.upper_k * iqr;

    let (clean, outliers): (Vec<f64>, Vec<f64>) =
        prices.iter().partition(|&&p| p >= lower && p <= upper);

    if clean.is_empty() {
        return untouched();
    }

    FilterOutcome {
        clean,
        outliers,
        fences: Some((lower, upper)),
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}
