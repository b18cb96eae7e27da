//! Price cache coalescing tests
//!
//! The cache must collapse concurrent duplicate-key lookups into a single
//! remote call, cache definitive "no price" answers, and leave transient
//! failures uncached so they can be retried on a later lookup.

use async_trait::async_trait;
use migratectl::error::{MigratectlError, Result};
use migratectl::pricing::{Platform, PriceCache, PricingSource, TermRates};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RATES: TermRates = TermRates {
    on_demand_hourly: 0.096,
    reserved_1yr_hourly: 0.060,
    reserved_3yr_hourly: 0.040,
};

/// Mock source that counts remote calls and can be told how to answer.
struct CountingSource {
    term_calls: AtomicU32,
    storage_calls: AtomicU32,
    delay: Duration,
    mode: Mode,
}

enum Mode {
    Ok,
    Unavailable,
    Transient,
}

impl CountingSource {
    fn new(mode: Mode, delay: Duration) -> Self {
        Self {
            term_calls: AtomicU32::new(0),
            storage_calls: AtomicU32::new(0),
            delay,
            mode,
        }
    }
}

#[async_trait]
impl PricingSource for CountingSource {
    async fn term_rates(
        &self,
        instance_type: &str,
        _platform: Platform,
        region: &str,
    ) -> Result<TermRates> {
        self.term_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match self.mode {
            Mode::Ok => Ok(RATES),
            Mode::Unavailable => Err(MigratectlError::PriceUnavailable {
                instance_type: instance_type.to_string(),
                region: region.to_string(),
                detail: "no such SKU".to_string(),
            }),
            Mode::Transient => Err(MigratectlError::PricingApi {
                operation: "term_rates".to_string(),
                message: "throttled".to_string(),
                source: None,
            }),
        }
    }

    async fn storage_rate(&self, _region: &str) -> Result<f64> {
        self.storage_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(0.08)
    }
}

fn cache_over(source: Arc<CountingSource>, attempts: u32) -> Arc<PriceCache> {
    Arc::new(PriceCache::new(
        source,
        attempts,
        Duration::from_secs(5),
    ))
}

#[tokio::test]
async fn concurrent_duplicate_lookups_make_one_remote_call() {
    let source = Arc::new(CountingSource::new(Mode::Ok, Duration::from_millis(50)));
    let cache = cache_over(Arc::clone(&source), 1);

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let cache = Arc::clone(&cache);
        tasks.push(tokio::spawn(async move {
            cache.quote("m5.large", Platform::Linux, "us-east-1").await
        }));
    }

    for task in tasks {
        let quote = task.await.unwrap().unwrap();
        assert_eq!(quote.rates, RATES);
        assert_eq!(quote.storage_gib_month, 0.08);
    }

    // 16 waiters, one in-flight call per key
    assert_eq!(source.term_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.storage_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn distinct_keys_fetch_independently() {
    let source = Arc::new(CountingSource::new(Mode::Ok, Duration::from_millis(5)));
    let cache = cache_over(Arc::clone(&source), 1);

    cache
        .quote("m5.large", Platform::Linux, "us-east-1")
        .await
        .unwrap();
    cache
        .quote("m5.large", Platform::Windows, "us-east-1")
        .await
        .unwrap();
    cache
        .quote("m5.xlarge", Platform::Linux, "us-east-1")
        .await
        .unwrap();

    assert_eq!(source.term_calls.load(Ordering::SeqCst), 3);
    // Storage rate is per-region, shared by all three quotes
    assert_eq!(source.storage_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unavailable_answers_are_cached() {
    let source = Arc::new(CountingSource::new(
        Mode::Unavailable,
        Duration::from_millis(1),
    ));
    let cache = cache_over(Arc::clone(&source), 3);

    for _ in 0..4 {
        let err = cache
            .quote("x1e.32xlarge", Platform::Linux, "us-east-1")
            .await
            .unwrap_err();
        assert!(matches!(err, MigratectlError::PriceUnavailable { .. }));
    }

    // A definitive miss is an answer: one remote call, no retries
    assert_eq!(source.term_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_failures_are_retried_then_not_cached() {
    let source = Arc::new(CountingSource::new(
        Mode::Transient,
        Duration::from_millis(1),
    ));
    let cache = cache_over(Arc::clone(&source), 2);

    let err = cache
        .quote("m5.large", Platform::Linux, "us-east-1")
        .await
        .unwrap_err();
    assert!(matches!(err, MigratectlError::RetryExhausted { .. }));
    assert_eq!(source.term_calls.load(Ordering::SeqCst), 2);

    // The failure was not cached; a later lookup tries again
    let _ = cache
        .quote("m5.large", Platform::Linux, "us-east-1")
        .await
        .unwrap_err();
    assert_eq!(source.term_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn slow_sources_hit_the_deadline() {
    struct SlowSource;

    #[async_trait]
    impl PricingSource for SlowSource {
        async fn term_rates(
            &self,
            _instance_type: &str,
            _platform: Platform,
            _region: &str,
        ) -> Result<TermRates> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(RATES)
        }

        async fn storage_rate(&self, _region: &str) -> Result<f64> {
            Ok(0.08)
        }
    }

    let cache = PriceCache::new(Arc::new(SlowSource), 1, Duration::from_millis(50));
    let err = cache
        .quote("m5.large", Platform::Linux, "us-east-1")
        .await
        .unwrap_err();
    // One attempt, deadline exceeded, surfaced as exhaustion
    assert!(matches!(err, MigratectlError::RetryExhausted { .. }));
}
