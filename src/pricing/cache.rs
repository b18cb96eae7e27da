//! Single-flight price cache
//!
//! The cache is the only shared mutable state in an estimation run. Each
//! quote key owns a `tokio::sync::OnceCell`; concurrent lookups for the same
//! key all await the same cell, so at most one remote call is ever in flight
//! per key and every waiter receives the resulting value.
//!
//! Definitive "no such price" answers are cached alongside successes so a
//! batch full of identical hosts asks the remote service once either way.
//! Transient failures (timeouts, API errors after retry exhaustion) leave the
//! cell empty; a later lookup for the same key may try again.

use crate::error::{MigratectlError, Result};
use crate::pricing::{Platform, PriceQuote, PricingSource, TermRates};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QuoteKey {
    instance_type: String,
    region: String,
    platform: Platform,
}

/// What a completed lookup left behind. `Unavailable` is a real, cacheable
/// answer; transient errors never become an outcome.
#[derive(Clone)]
enum Outcome<T> {
    Ready(T),
    Unavailable { detail: String },
}

type QuoteCell = Arc<OnceCell<Outcome<TermRates>>>;
type StorageCell = Arc<OnceCell<Outcome<f64>>>;

pub struct PriceCache {
    source: Arc<dyn PricingSource>,
    retry: ExponentialBackoffPolicy,
    request_timeout: Duration,
    quotes: Mutex<HashMap<QuoteKey, QuoteCell>>,
    storage: Mutex<HashMap<String, StorageCell>>,
}

impl PriceCache {
    pub fn new(
        source: Arc<dyn PricingSource>,
        retry_attempts: u32,
        request_timeout: Duration,
    ) -> Self {
        Self {
            source,
            retry: ExponentialBackoffPolicy::new(retry_attempts),
            request_timeout,
            quotes: Mutex::new(HashMap::new()),
            storage: Mutex::new(HashMap::new()),
        }
    }

    /// Look up (or fetch) the full quote for one key.
    ///
    /// Instance rates and the regional storage rate are cached independently;
    /// the returned `PriceQuote` combines both.
    pub async fn quote(
        &self,
        instance_type: &str,
        platform: Platform,
        region: &str,
    ) -> Result<PriceQuote> {
        let rates = self.term_rates(instance_type, platform, region).await?;
        let storage_gib_month = self.storage_rate(region).await?;
        Ok(PriceQuote {
            instance_type: instance_type.to_string(),
            region: region.to_string(),
            platform,
            rates,
            storage_gib_month,
        })
    }

    async fn term_rates(
        &self,
        instance_type: &str,
        platform: Platform,
        region: &str,
    ) -> Result<TermRates> {
        let key = QuoteKey {
            instance_type: instance_type.to_string(),
            region: region.to_string(),
            platform,
        };

        let cell = {
            let mut quotes = self.quotes.lock().await;
            Arc::clone(quotes.entry(key.clone()).or_default())
        };

        let outcome = cell
            .get_or_try_init(|| async {
                debug!("Cache miss for {} in {}", key.instance_type, key.region);
                let fetch = || async {
                    self.with_deadline(
                        "term_rates",
                        self.source.term_rates(&key.instance_type, key.platform, &key.region),
                    )
                    .await
                };
                match self.retry.execute_with_retry(fetch).await {
                    Ok(rates) => Ok(Outcome::Ready(rates)),
                    Err(MigratectlError::PriceUnavailable { detail, .. }) => {
                        Ok(Outcome::Unavailable { detail })
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        match outcome {
            Outcome::Ready(rates) => Ok(*rates),
            Outcome::Unavailable { detail } => Err(MigratectlError::PriceUnavailable {
                instance_type: instance_type.to_string(),
                region: region.to_string(),
                detail: detail.clone(),
            }),
        }
    }

    async fn storage_rate(&self, region: &str) -> Result<f64> {
        let cell = {
            let mut storage = self.storage.lock().await;
            Arc::clone(storage.entry(region.to_string()).or_default())
        };

        let region_owned = region.to_string();
        let outcome = cell
            .get_or_try_init(|| async {
                let fetch = || async {
                    self.with_deadline("storage_rate", self.source.storage_rate(&region_owned))
                        .await
                };
                match self.retry.execute_with_retry(fetch).await {
                    Ok(rate) => Ok(Outcome::Ready(rate)),
                    Err(MigratectlError::PriceUnavailable { detail, .. }) => {
                        Ok(Outcome::Unavailable { detail })
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        match outcome {
            Outcome::Ready(rate) => Ok(*rate),
            Outcome::Unavailable { detail } => Err(MigratectlError::PriceUnavailable {
                instance_type: "ebs-gp".to_string(),
                region: region.to_string(),
                detail: detail.clone(),
            }),
        }
    }

    /// Bound a remote call by the configured deadline.
    async fn with_deadline<T>(
        &self,
        operation: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MigratectlError::Timeout {
                operation: operation.to_string(),
                timeout_secs: self.request_timeout.as_secs(),
            }),
        }
    }
}
