//! Bounded concurrent fan-out with per-unit failure isolation.
//!
//! Every component that talks to several external sources at once goes through
//! [`FanOut::run`]: one unit per task, at most `max_concurrency` in flight, each
//! unit bounded by `unit_timeout`. Errors, timeouts and panics all end up as the
//! `outcome` of that unit; the batch itself never fails. Completion order is
//! arbitrary, so callers sort the returned units when they need determinism.

use crate::domain::error::SourceError;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutConfig {
    /// Upper bound on units in flight. The effective cap is
    /// `min(task count, max_concurrency)`.
    pub max_concurrency: usize,
    pub unit_timeout: Duration,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            unit_timeout: Duration::from_secs(20),
        }
    }
}

/// Result of one unit.
#[derive(Debug)]
pub struct UnitResult<K, T> {
    pub key: K,
    pub outcome: Result<T, SourceError>,
    pub elapsed: Duration,
}

impl<K, T> UnitResult<K, T> {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FanOut {
    config: FanOutConfig,
}

impl FanOut {
    pub fn new(config: FanOutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> FanOutConfig {
        self.config
    }

    /// Effective concurrency for a batch of `tasks` units.
    pub fn concurrency_for(&self, tasks: usize) -> usize {
        tasks.min(self.config.max_concurrency).max(1)
    }

    /// Run `unit` once per key and gather every outcome.
    pub async fn run<K, T, F, Fut>(&self, keys: Vec<K>, unit: F) -> Vec<UnitResult<K, T>>
    where
        K: Clone,
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        if keys.is_empty() {
            return Vec::new();
        }
        let limit = self.concurrency_for(keys.len());
        let timeout = self.config.unit_timeout;

        let units = keys.into_iter().map(|key| {
            let fut = unit(key.clone());
            async move {
                let started = Instant::now();
                let outcome = isolate(timeout, fut).await;
                UnitResult {
                    key,
                    outcome,
                    elapsed: started.elapsed(),
                }
            }
        });

        stream::iter(units).buffer_unordered(limit).collect().await
    }
}

/// Bound `fut` by `timeout` and turn a panic inside it into an error.
pub async fn isolate<T, Fut>(timeout: Duration, fut: Fut) -> Result<T, SourceError>
where
    Fut: Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(timeout, contain(fut)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(SourceError::ProviderUnavailable(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Turn a panic inside `fut` into an error, without a time bound.
pub async fn contain<T, Fut>(fut: Fut) -> Result<T, SourceError>
where
    Fut: Future<Output = Result<T, SourceError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(SourceError::ProviderUnavailable(format!(
            "unit panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fanout(max: usize, timeout_ms: u64) -> FanOut {
        FanOut::new(FanOutConfig {
            max_concurrency: max,
            unit_timeout: Duration::from_millis(timeout_ms),
        })
    }

    #[tokio::test]
    async fn test_every_unit_reports() {
        let results = fanout(4, 1000)
            .run(vec![1u32, 2, 3, 4, 5], |n| async move {
                if n % 2 == 0 {
                    Err(SourceError::ParseFailure(format!("even {n}")))
                } else {
                    Ok(n * 10)
                }
            })
            .await;

        assert_eq!(results.len(), 5);
        let mut ok: Vec<u32> = results.iter().filter_map(|r| r.outcome.clone().ok()).collect();
        ok.sort();
        assert_eq!(ok, vec![10, 30, 50]);
        assert_eq!(results.iter().filter(|r| r.outcome.is_err()).count(), 2);
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let results = fanout(2, 1000)
            .run(vec!["ok", "boom"], |k| async move {
                if k == "boom" {
                    panic!("selector drifted");
                }
                Ok::<_, SourceError>(k.len())
            })
            .await;

        let boom = results.iter().find(|r| r.key == "boom").unwrap();
        match &boom.outcome {
            Err(SourceError::ProviderUnavailable(msg)) => assert!(msg.contains("selector drifted")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(results.iter().find(|r| r.key == "ok").unwrap().outcome, Ok(2));
    }

    #[tokio::test]
    async fn test_slow_unit_times_out_alone() {
        let results = fanout(3, 50)
            .run(vec![0u64, 5_000], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, SourceError>(delay)
            })
            .await;

        let fast = results.iter().find(|r| r.key == 0).unwrap();
        assert_eq!(fast.outcome, Ok(0));
        let slow = results.iter().find(|r| r.key == 5_000).unwrap();
        assert!(matches!(slow.outcome, Err(SourceError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = fanout(3, 2000)
            .run((0..12).collect::<Vec<u32>>(), |_| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, SourceError>(())
                }
            })
            .await;

        assert_eq!(results.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results: Vec<UnitResult<u8, u8>> =
            FanOut::default().run(Vec::new(), |k| async move { Ok(k) }).await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_concurrency_for() {
        let f = fanout(10, 100);
        assert_eq!(f.concurrency_for(3), 3);
        assert_eq!(f.concurrency_for(40), 10);
        assert_eq!(f.concurrency_for(0), 1);
    }
}
